//! Opcode families: legacy-encoded records that share the same opcode bytes and ModR/M opcode
//! extension, and so differ only in the operand width selected through prefixes.

use ahash::AHashMap;

use super::InstructionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpcodeFamilyKey {
    pub opcode: u32,
    pub modrm_opcode_extension: Option<u8>,
}

impl OpcodeFamilyKey {
    /// Returns the family of a legacy-encoded record; `None` for unparsed and VEX/EVEX records.
    pub fn of(record: &InstructionRecord) -> Option<Self> {
        let spec = record.structured_spec.as_ref()?;
        spec.legacy_prefixes()?;
        Some(Self {
            opcode: spec.opcode,
            modrm_opcode_extension: spec.family_extension(),
        })
    }
}

/// Groups record indices by opcode family. Families appear in order of their first member and
/// members keep their original relative order.
pub fn group_by_family(records: &[InstructionRecord]) -> Vec<(OpcodeFamilyKey, Vec<usize>)> {
    let mut slots: AHashMap<OpcodeFamilyKey, usize> = AHashMap::new();
    let mut families: Vec<(OpcodeFamilyKey, Vec<usize>)> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(key) = OpcodeFamilyKey::of(record) else {
            continue;
        };
        let slot = *slots.entry(key).or_insert_with(|| {
            families.push((key, Vec::new()));
            families.len() - 1
        });
        families[slot].1.push(index);
    }
    families
}
