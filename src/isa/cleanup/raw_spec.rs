//! Textual repairs of `raw_spec` strings copied out of the vendor manuals.
//!
//! These transforms run before the encodings are parsed and only look at text.

use tracing::warn;

use super::operand_size::prepend_operand_size_override_token;
use crate::isa::encoding::{InstructionRecord, InstructionSet};
use crate::isa::error::IsaError;

const REX_W_TOKEN: &str = "REX.W";

fn replace_tokens(text: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while !rest.is_empty() {
        for (from, to) in replacements {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// `VEX.128.0F.0 ...` spells the W bit without its `W`.
fn fix_vex_w0(raw_spec: &mut String) {
    let Some((head, _)) = raw_spec.split_once(' ') else {
        return;
    };
    if head.starts_with("VEX") && head.ends_with(".0") {
        let at = head.len() - 1;
        raw_spec.insert(at, 'W');
    }
}

pub fn fix_encoding_specifications(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    const REPLACEMENTS: [(&str, &str); 3] = [("0f", "0F"), ("imm8", "ib"), ("/ib", "ib")];
    for record in &mut instruction_set.instructions {
        let mut raw_spec = replace_tokens(&record.raw_spec, &REPLACEMENTS);
        fix_vex_w0(&mut raw_spec);
        record.raw_spec = raw_spec;
    }
    Ok(())
}

/// Strips a trailing `(mod...)` note such as `0F 01 /7 (mod=11)`.
pub fn drop_modrm_mod_details(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    for record in &mut instruction_set.instructions {
        if !record.raw_spec.ends_with(')') {
            continue;
        }
        if let Some(start) = record.raw_spec.find("(mod") {
            record.raw_spec.truncate(start);
            let trimmed = record.raw_spec.trim_end().len();
            record.raw_spec.truncate(trimmed);
        }
    }
    Ok(())
}

pub fn fix_rex_prefix_specification(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    const REPLACEMENTS: [(&str, &str); 4] = [
        ("REX + 0F B2 /r", "REX.W + 0F B2 /r"),
        ("REX + 0F B4 /r", "REX.W + 0F B4 /r"),
        ("REX + 0F B5 /r", "REX.W + 0F B5 /r"),
        ("REX + 0F BE /r", "REX.W + 0F BE /r"),
    ];
    for record in &mut instruction_set.instructions {
        if let Some((_, fixed)) = REPLACEMENTS.iter().find(|(from, _)| *from == record.raw_spec) {
            record.raw_spec = (*fixed).to_string();
        }
    }
    Ok(())
}

/// VEX encodings say `LIG`, EVEX encodings say `LLIG`; both mean the vector length is ignored.
pub fn normalize_lig_flag(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    for record in &mut instruction_set.instructions {
        if record.raw_spec.contains(".LLIG.") {
            record.raw_spec = record.raw_spec.replace(".LLIG.", ".LIG.");
        }
    }
    Ok(())
}

/// Prepends `REX.W ` to `raw_spec` unless the prefix is already mentioned.
pub fn add_rex_w_prefix_to_raw_spec(record: &mut InstructionRecord) {
    if record.raw_spec.contains(REX_W_TOKEN) {
        warn!(raw_spec = %record.raw_spec, "the instruction already has a REX.W prefix");
        return;
    }
    record.raw_spec = format!("{REX_W_TOKEN} {}", record.raw_spec);
}

/// The `MOV` forms with a memory offset (`moffs`) list only their 64-bit address form. Adds the
/// 32-bit address form and spells out the immediate of both.
pub fn add_missing_memory_offset_encoding(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    const ENCODINGS: [&str; 8] = [
        "A0", "REX.W + A0", "A1", "REX.W + A1", "A2", "REX.W + A2", "A3", "REX.W + A3",
    ];
    let mut added = Vec::new();
    for record in &mut instruction_set.instructions {
        if !ENCODINGS.contains(&record.raw_spec.as_str()) {
            continue;
        }
        let mut short_address = record.clone();
        short_address.raw_spec = format!("67 {} id", record.raw_spec);
        added.push(short_address);
        record.raw_spec.push_str(" io");
    }
    instruction_set.instructions.extend(added);
    Ok(())
}

/// Appends a ModR/M, immediate or VSIB suffix to encodings the manual lists without one.
pub fn add_missing_modrm_and_immediate_specification(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    const FIXES: [(&[&str], &str); 3] = [
        (&["CVTDQ2PD", "VMOVD", "WRSSD", "WRSSQ", "WRUSSD", "WRUSSQ"], "/r"),
        (
            &[
                "KSHIFTLB", "KSHIFTLW", "KSHIFTLD", "KSHIFTLQ", "KSHIFTRB", "KSHIFTRW", "KSHIFTRD",
                "KSHIFTRQ", "VFIXUPIMMPS", "VFPCLASSSS", "VRANGESD", "VRANGESS", "VREDUCESD",
            ],
            "ib",
        ),
        (
            &[
                "VGATHERDPD", "VGATHERQPD", "VGATHERDPS", "VGATHERQPS", "VPGATHERDD", "VPGATHERDQ",
                "VPGATHERQD", "VPGATHERQQ",
            ],
            "/vsib",
        ),
    ];
    for record in &mut instruction_set.instructions {
        for (mnemonics, suffix) in FIXES {
            if !mnemonics.contains(&record.mnemonic.as_str()) {
                continue;
            }
            if record.raw_spec.is_empty() {
                return Err(IsaError::MissingEncoding {
                    mnemonic: record.mnemonic.clone(),
                    raw_spec: String::new(),
                });
            }
            if !record.raw_spec.ends_with(suffix) {
                record.raw_spec.push(' ');
                record.raw_spec.push_str(suffix);
            }
        }
    }
    Ok(())
}

fn is_fs_or_gs_form(record: &InstructionRecord, mnemonic: &str) -> bool {
    record.mnemonic == mnemonic
        && record.operands.len() == 1
        && matches!(record.operands[0].name.as_str(), "FS" | "GS")
}

/// `POP FS`/`POP GS` are listed once per operand size; the size is only stated in the
/// description. Marks the 16-bit form and adds a `REX.W` copy of the 64-bit form.
pub fn fix_encoding_specification_of_pop_fs_and_gs(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    let mut added = Vec::new();
    for record in &mut instruction_set.instructions {
        if !is_fs_or_gs_form(record, "POP") {
            continue;
        }
        let description = record.description.as_deref().unwrap_or_default();
        if description.contains("16 bits") {
            prepend_operand_size_override_token(&mut record.raw_spec);
        } else if description.contains("64 bits") {
            let mut wide = record.clone();
            add_rex_w_prefix_to_raw_spec(&mut wide);
            added.push(wide);
        }
    }
    instruction_set.instructions.extend(added);
    Ok(())
}

/// `PUSH FS`/`PUSH GS` are listed only once. Adds the 16-bit form and a `REX.W` form.
pub fn fix_encoding_specification_of_push_fs_and_gs(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    let mut added = Vec::new();
    for record in instruction_set.iter().filter(|r| is_fs_or_gs_form(r, "PUSH")) {
        let mut narrow = record.clone();
        prepend_operand_size_override_token(&mut narrow.raw_spec);
        added.push(narrow);
        let mut wide = record.clone();
        add_rex_w_prefix_to_raw_spec(&mut wide);
        added.push(wide);
    }
    instruction_set.instructions.extend(added);
    Ok(())
}

/// The `SETcc` forms list a redundant `REX +` variant and omit the `/0` of their ModR/M byte.
pub fn fix_and_clean_up_encoding_specifications_of_set_instructions(
    instruction_set: &mut InstructionSet,
) -> Result<(), IsaError> {
    fn is_setcc(raw_spec: &str) -> bool {
        raw_spec
            .strip_prefix("0F 9")
            .is_some_and(|digit| digit.len() == 1 && digit.chars().all(|c| c.is_ascii_hexdigit()))
    }
    instruction_set
        .instructions
        .retain(|record| !record.raw_spec.strip_prefix("REX + ").is_some_and(is_setcc));
    for record in &mut instruction_set.instructions {
        if is_setcc(&record.raw_spec) {
            record.raw_spec.push_str(" /0");
        }
    }
    Ok(())
}

/// `XBEGIN` is listed as `C7 F8` for both offset sizes; the operand tells them apart.
pub fn fix_encoding_specification_of_xbegin(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    const XBEGIN: &str = "C7 F8";
    let mut fixes = Vec::new();
    for (index, record) in instruction_set.instructions.iter().enumerate() {
        if record.raw_spec != XBEGIN {
            continue;
        }
        let fixed = match record.operands.as_slice() {
            [operand] if operand.name == "rel16" => "66 C7 F8 cw",
            [operand] if operand.name == "rel32" => "C7 F8 cd",
            [operand] => {
                return Err(IsaError::malformed(
                    &record.mnemonic,
                    &record.raw_spec,
                    format!("unexpected XBEGIN operand '{}'", operand.name),
                ));
            }
            operands => {
                return Err(IsaError::malformed(
                    &record.mnemonic,
                    &record.raw_spec,
                    format!("XBEGIN takes one operand, got {}", operands.len()),
                ));
            }
        };
        fixes.push((index, fixed));
    }
    for (index, fixed) in fixes {
        instruction_set.instructions[index].raw_spec = fixed.to_string();
    }
    Ok(())
}

/// `STR r/m16` (`0F 00 /1`) also exists with `REX.W`, which the manual does not list.
pub fn add_rex_w_prefixed_version_of_str(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    const STR: &str = "0F 00 /1";
    let found = instruction_set.iter().find(|r| r.raw_spec == STR).cloned();
    if let Some(record) = found {
        let mut wide = record;
        add_rex_w_prefix_to_raw_spec(&mut wide);
        instruction_set.push(wide);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::encoding::{Operand, OperandUsage};

    fn set_of(raw_specs: &[&str]) -> InstructionSet {
        raw_specs
            .iter()
            .map(|raw| InstructionRecord::builder("OP").raw_spec(*raw).finish())
            .collect()
    }

    fn raw_specs(set: &InstructionSet) -> Vec<&str> {
        set.iter().map(|r| r.raw_spec.as_str()).collect()
    }

    #[test]
    fn fixes_case_immediates_and_vex_w() {
        let mut set = set_of(&[
            "0f 38 F0 /r",
            "6B /r imm8",
            "C1 /4 /ib",
            "VEX.128.66.0F38.0 F7 /r",
            "VEX.NDS.LZ.0F38.W0 F2 /r",
            "VEX.L0.0F.0",
        ]);
        fix_encoding_specifications(&mut set).expect("fix");
        assert_eq!(
            raw_specs(&set),
            vec![
                "0F 38 F0 /r",
                "6B /r ib",
                "C1 /4 ib",
                "VEX.128.66.0F38.W0 F7 /r",
                "VEX.NDS.LZ.0F38.W0 F2 /r",
                "VEX.L0.0F.0",
            ]
        );
    }

    #[test]
    fn drops_mod_annotation() {
        let mut set = set_of(&["0F 01 /7 (mod=11)", "0F AE /0 (mod != 11)", "D8 /0"]);
        drop_modrm_mod_details(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["0F 01 /7", "0F AE /0", "D8 /0"]);
    }

    #[test]
    fn fixes_rex_forms_and_lig() {
        let mut set = set_of(&["REX + 0F B2 /r", "REX + 0F B6 /r", "EVEX.LLIG.F2.0F38.W0 9B /r"]);
        fix_rex_prefix_specification(&mut set).expect("fix");
        normalize_lig_flag(&mut set).expect("fix");
        assert_eq!(
            raw_specs(&set),
            vec!["REX.W + 0F B2 /r", "REX + 0F B6 /r", "EVEX.LIG.F2.0F38.W0 9B /r"]
        );
    }

    #[test]
    fn rex_w_is_not_added_twice() {
        let mut record = InstructionRecord::builder("POP").raw_spec("REX.W 0F A1").finish();
        add_rex_w_prefix_to_raw_spec(&mut record);
        assert_eq!(record.raw_spec, "REX.W 0F A1");
    }

    #[test]
    fn memory_offset_forms_get_both_address_sizes() {
        let mut set = set_of(&["A0", "88 /r"]);
        add_missing_memory_offset_encoding(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["A0 io", "88 /r", "67 A0 id"]);
    }

    #[test]
    fn missing_suffixes_are_added_once() {
        let mut set: InstructionSet = [("VMOVD", "VEX.128.66.0F.W0 6E"), ("KSHIFTLB", "VEX.L0.66.0F3A.W0 32 /r ib")]
            .into_iter()
            .map(|(mnemonic, raw)| InstructionRecord::builder(mnemonic).raw_spec(raw).finish())
            .collect();
        add_missing_modrm_and_immediate_specification(&mut set).expect("fix");
        assert_eq!(
            raw_specs(&set),
            vec!["VEX.128.66.0F.W0 6E /r", "VEX.L0.66.0F3A.W0 32 /r ib"]
        );

        let mut empty = InstructionSet::new(vec![InstructionRecord::builder("VGATHERDPD").finish()]);
        assert!(add_missing_modrm_and_immediate_specification(&mut empty).is_err());
    }

    fn segment_form(mnemonic: &str, segment: &str, raw: &str, description: &str) -> InstructionRecord {
        InstructionRecord::builder(mnemonic)
            .operand(Operand::new(segment, OperandUsage::Read, 16))
            .raw_spec(raw)
            .description(description)
            .finish()
    }

    #[test]
    fn pop_fs_forms_are_split_by_description() {
        let mut set = InstructionSet::new(vec![
            segment_form("POP", "FS", "0F A1", "Pop top of stack into FS; increment stack pointer by 16 bits."),
            segment_form("POP", "FS", "0F A1", "Pop top of stack into FS; increment stack pointer by 64 bits."),
            segment_form("POP", "DS", "1F", "Pop top of stack into DS; increment stack pointer by 16 bits."),
        ]);
        fix_encoding_specification_of_pop_fs_and_gs(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["66 0F A1", "0F A1", "1F", "REX.W 0F A1"]);
    }

    #[test]
    fn push_gs_gets_narrow_and_rex_forms() {
        let mut set = InstructionSet::new(vec![segment_form("PUSH", "GS", "0F A8", "Push GS.")]);
        fix_encoding_specification_of_push_fs_and_gs(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["0F A8", "66 0F A8", "REX.W 0F A8"]);
    }

    #[test]
    fn setcc_drops_rex_forms_and_gains_modrm() {
        let mut set = set_of(&["0F 94", "REX + 0F 94", "0F 9F", "0F 94 /0", "0F 90 /r", "REX + 0F B6 /r"]);
        fix_and_clean_up_encoding_specifications_of_set_instructions(&mut set).expect("fix");
        assert_eq!(
            raw_specs(&set),
            vec!["0F 94 /0", "0F 9F /0", "0F 94 /0", "0F 90 /r", "REX + 0F B6 /r"]
        );
    }

    fn xbegin(operand: &str) -> InstructionRecord {
        InstructionRecord::builder("XBEGIN")
            .operand(Operand::new(operand, OperandUsage::Read, 32))
            .raw_spec("C7 F8")
            .finish()
    }

    #[test]
    fn xbegin_encoding_follows_offset_size() {
        let mut set = InstructionSet::new(vec![xbegin("rel16"), xbegin("rel32")]);
        fix_encoding_specification_of_xbegin(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["66 C7 F8 cw", "C7 F8 cd"]);
    }

    #[test]
    fn xbegin_with_unknown_operand_is_rejected_untouched() {
        let mut set = InstructionSet::new(vec![xbegin("rel16"), xbegin("rel8")]);
        let err = fix_encoding_specification_of_xbegin(&mut set).expect_err("rel8 is not an XBEGIN form");
        assert!(matches!(err, IsaError::MalformedEncoding { .. }));
        assert_eq!(raw_specs(&set), vec!["C7 F8", "C7 F8"], "no record changes on failure");

        let mut bare = InstructionSet::new(vec![InstructionRecord::builder("XBEGIN").raw_spec("C7 F8").finish()]);
        assert!(fix_encoding_specification_of_xbegin(&mut bare).is_err());
    }

    #[test]
    fn str_gets_a_rex_w_copy() {
        let mut set = set_of(&["0F 00 /0", "0F 00 /1"]);
        add_rex_w_prefixed_version_of_str(&mut set).expect("fix");
        assert_eq!(raw_specs(&set), vec!["0F 00 /0", "0F 00 /1", "REX.W 0F 00 /1"]);
    }
}
