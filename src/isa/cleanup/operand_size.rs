//! Operand-size override (`66`) insertion.
//!
//! The vendor manuals frequently list the 16-bit and 32-bit forms of an instruction with the same
//! encoding. The passes in this module mark the 16-bit forms as requiring the operand-size
//! override prefix so that the two forms can be told apart.

use ahash::AHashMap;
use tracing::debug;

use crate::isa::encoding::{EncodingSpecification, InstructionRecord, InstructionSet, PrefixUsage};
use crate::isa::error::IsaError;

const OPERAND_SIZE_OVERRIDE_TOKEN: &str = "66";

/// 16-bit forms whose operands are all implicit, so the width cannot be read from the syntax.
const SIXTEEN_BIT_IMPLICIT_OPERAND_MNEMONICS: [&str; 12] = [
    "CMPSW", "CBW", "CWD", "INSW", "IRET", "LODSW", "MOVSW", "OUTSW", "POPF", "PUSHF", "SCASW",
    "STOSW",
];

/// Encodings shared by a 16-bit and a wider form where the 16-bit form is recognized by the name
/// of one operand. The value is the index of that operand.
const SPECIAL_CASE_OPERAND_INDEX: [(&str, usize); 12] = [
    ("0F 01 /4", 0),
    ("0F B2 /r", 0),
    ("0F B4 /r", 0),
    ("0F B5 /r", 0),
    ("50+rw", 0),
    ("58+ rw", 0),
    ("62 /r", 0),
    ("8F /0", 0),
    ("C4 /r", 0),
    ("C5 /r", 0),
    ("F2 0F 38 F1 /r", 1),
    ("FF /6", 0),
];

const SIXTEEN_BIT_OPERAND_NAMES: [&str; 2] = ["r16", "r/m16"];

/// Forms that operate on 16-bit data whether or not the `66` prefix is present; assemblers may
/// emit either, so both versions are listed. The value is the index of the sized operand.
const OPTIONAL_OVERRIDE_OPERAND_INDEX: [(&str, usize); 3] = [("8C /r", 0), ("0F 00 /0", 0), ("0F 00 /1", 0)];

/// Marks `record` as requiring the operand-size override prefix.
///
/// Does nothing for unparsed records, VEX/EVEX records and records whose operand-size override
/// usage is already explicit. Otherwise prepends `66 ` to `raw_spec` unless it is already the
/// leading token, and sets the usage to `Required`. Returns whether the record changed.
pub fn apply_operand_size_override(record: &mut InstructionRecord) -> Result<bool, IsaError> {
    record.check_structured_spec()?;
    let Some(prefixes) = record.legacy_prefixes_mut() else {
        return Ok(false);
    };
    if !prefixes.operand_size_override.is_unspecified() {
        return Ok(false);
    }
    prefixes.operand_size_override = PrefixUsage::Required;
    prepend_operand_size_override_token(&mut record.raw_spec);
    Ok(true)
}

/// Textual half of [`apply_operand_size_override`], usable before `raw_spec` is parsed.
pub(crate) fn prepend_operand_size_override_token(raw_spec: &mut String) {
    if raw_spec.split_whitespace().next() == Some(OPERAND_SIZE_OVERRIDE_TOKEN) {
        return;
    }
    *raw_spec = if raw_spec.is_empty() {
        OPERAND_SIZE_OVERRIDE_TOKEN.to_string()
    } else {
        format!("{OPERAND_SIZE_OVERRIDE_TOKEN} {raw_spec}")
    };
}

pub fn add_operand_size_override_to_instructions_with_implicit_operands(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    for record in &mut instruction_set.instructions {
        if SIXTEEN_BIT_IMPLICIT_OPERAND_MNEMONICS.contains(&record.mnemonic.as_str()) {
            apply_operand_size_override(record)?;
        }
    }
    Ok(())
}

/// Whether the operand that `table` designates for `record` is named like a 16-bit operand.
/// Records whose `raw_spec` is not in `table` yield `Ok(false)`.
fn has_sixteen_bit_designated_operand(
    record: &InstructionRecord,
    table: &[(&str, usize)],
) -> Result<bool, IsaError> {
    let Some(&(_, operand_index)) = table.iter().find(|(raw_spec, _)| *raw_spec == record.raw_spec) else {
        return Ok(false);
    };
    let Some(operand) = record.operands.get(operand_index) else {
        return Err(IsaError::malformed(
            &record.mnemonic,
            &record.raw_spec,
            format!("expected at least {} operands", operand_index + 1),
        ));
    };
    Ok(SIXTEEN_BIT_OPERAND_NAMES.contains(&operand.name.as_str()))
}

pub fn add_operand_size_override_to_special_case_instructions(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    for record in &mut instruction_set.instructions {
        if has_sixteen_bit_designated_operand(record, &SPECIAL_CASE_OPERAND_INDEX)? {
            apply_operand_size_override(record)?;
        }
    }
    Ok(())
}

/// Adds a copy with the operand-size override prefix of every form in
/// [`OPTIONAL_OVERRIDE_OPERAND_INDEX`] whose sized operand is 16-bit. The copy requires the
/// prefix even when the original already states its usage.
pub fn add_operand_size_override_version_for_special_case_instructions(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    let mut added = Vec::new();
    for record in instruction_set.iter() {
        if !has_sixteen_bit_designated_operand(record, &OPTIONAL_OVERRIDE_OPERAND_INDEX)? {
            continue;
        }
        record.check_structured_spec()?;
        let mut prefixed = record.clone();
        prepend_operand_size_override_token(&mut prefixed.raw_spec);
        if let Some(prefixes) = prefixed.legacy_prefixes_mut() {
            prefixes.operand_size_override = PrefixUsage::Required;
        }
        added.push(prefixed);
    }
    instruction_set.instructions.extend(added);
    Ok(())
}

/// Clusters legacy records whose encodings differ at most in immediate size and, in every
/// cluster holding both 16-bit and 32-bit forms, applies [`apply_operand_size_override`] to the
/// 16-bit ones.
///
/// A record with any 32-bit operand counts as 32-bit even when it also has 16-bit operands
/// (e.g. `OUT DX, EAX`). Records with a relative code offset are skipped since the offset size
/// follows the address size. Every record must carry a non-empty `raw_spec` and a well-formed
/// parsed encoding; all records are checked before any is modified.
pub fn add_operand_size_override_prefix(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    let mut slots: AHashMap<EncodingSpecification, usize> = AHashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (index, record) in instruction_set.instructions.iter().enumerate() {
        if record.raw_spec.is_empty() {
            return Err(IsaError::MissingEncoding {
                mnemonic: record.mnemonic.clone(),
                raw_spec: String::new(),
            });
        }
        record.check_structured_spec()?;
        let Some(spec) = &record.structured_spec else {
            return Err(IsaError::MissingEncoding {
                mnemonic: record.mnemonic.clone(),
                raw_spec: record.raw_spec.clone(),
            });
        };
        if spec.code_offset_bytes > 0 || spec.legacy_prefixes().is_none() {
            continue;
        }
        let key = EncodingSpecification {
            immediate_bytes: 0,
            code_offset_bytes: 0,
            ..spec.clone()
        };
        let slot = *slots.entry(key).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(index);
    }

    for members in clusters.into_iter().filter(|members| members.len() > 1) {
        let records = &instruction_set.instructions;
        let (wide, narrow): (Vec<usize>, Vec<usize>) = members
            .iter()
            .copied()
            .filter(|&i| records[i].has_operand_of_size(32) || records[i].has_operand_of_size(16))
            .partition(|&i| records[i].has_operand_of_size(32));
        let first = &records[members[0]];
        if wide.is_empty() || narrow.is_empty() {
            if !wide.is_empty() || !narrow.is_empty() {
                debug!(
                    raw_spec = %first.raw_spec,
                    "instruction has multiple versions, but they are not 16- and 32-bit"
                );
            }
            continue;
        }
        debug!(raw_spec = %first.raw_spec, forms = narrow.len(), "adding operand-size override");
        for index in narrow {
            apply_operand_size_override(&mut instruction_set.instructions[index])?;
        }
    }
    Ok(())
}
