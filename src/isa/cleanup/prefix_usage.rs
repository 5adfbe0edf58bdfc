//! Prefix usage inference across opcode families.
//!
//! Forms of one hardware opcode that differ only in operand width are told apart by legacy
//! prefixes. When one member of a family requires a prefix, the prefix is reserved for that
//! member and the others must not carry it; when no member requires it, the prefix has no
//! distinguishing effect and is ignored.

use tracing::{debug, debug_span};

use crate::isa::encoding::{
    InstructionRecord, InstructionSet, LegacyPrefixes, PrefixKind, PrefixUsage, group_by_family,
};
use crate::isa::error::IsaError;

/// Fills every `Unspecified` value of one legacy prefix in `records`.
///
/// `read` and `write` select the prefix inside [`LegacyPrefixes`]. VEX/EVEX-encoded and
/// unparsed records are never touched, and values other than `Unspecified` are kept. All
/// structured specs are checked before the first mutation, so an error leaves `records` as it
/// was.
pub fn infer_legacy_prefix_usage<R, W>(
    read: R,
    mut write: W,
    records: &mut [InstructionRecord],
) -> Result<(), IsaError>
where
    R: Fn(&LegacyPrefixes) -> PrefixUsage,
    W: FnMut(&mut LegacyPrefixes, PrefixUsage),
{
    for record in records.iter() {
        record.check_structured_spec()?;
    }

    for (family, members) in group_by_family(records) {
        let has_required = members.iter().any(|&index| {
            records[index]
                .legacy_prefixes()
                .is_some_and(|prefixes| read(prefixes) == PrefixUsage::Required)
        });
        let fill = if has_required {
            PrefixUsage::NotPermitted
        } else {
            PrefixUsage::Ignored
        };
        debug!(
            opcode = format_args!("{:#x}", family.opcode),
            extension = ?family.modrm_opcode_extension,
            members = members.len(),
            ?fill,
            "inferred prefix usage for opcode family"
        );
        for index in members {
            if let Some(prefixes) = records[index].legacy_prefixes_mut() {
                if read(prefixes).is_unspecified() {
                    write(prefixes, fill);
                }
            }
        }
    }
    Ok(())
}

/// [`infer_legacy_prefix_usage`] instantiated for one [`PrefixKind`].
pub fn infer_prefix_usage(kind: PrefixKind, records: &mut [InstructionRecord]) -> Result<(), IsaError> {
    let _span = debug_span!("prefix_usage", prefix = kind.name()).entered();
    infer_legacy_prefix_usage(
        |prefixes| prefixes.get(kind),
        |prefixes, usage| prefixes.set(kind, usage),
        records,
    )
}

pub fn add_rex_w_prefix_usage(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    infer_prefix_usage(PrefixKind::RexW, &mut instruction_set.instructions)
}

pub fn add_operand_size_override_prefix_usage(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    infer_prefix_usage(PrefixKind::OperandSizeOverride, &mut instruction_set.instructions)
}
