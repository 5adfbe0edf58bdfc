use std::cmp::Ordering;

use crate::isa::encoding::{InstructionRecord, InstructionSet};
use crate::isa::error::IsaError;

fn compare_vendor_syntax(a: &InstructionRecord, b: &InstructionRecord) -> Ordering {
    a.mnemonic
        .cmp(&b.mnemonic)
        .then_with(|| {
            let names_a = a.operands.iter().map(|op| op.name.as_str());
            let names_b = b.operands.iter().map(|op| op.name.as_str());
            names_a.cmp(names_b)
        })
        .then_with(|| a.raw_spec.cmp(&b.raw_spec))
}

/// Stable sort by mnemonic, then operand names, then `raw_spec`.
pub fn sort_by_vendor_syntax(instruction_set: &mut InstructionSet) -> Result<(), IsaError> {
    instruction_set.instructions.sort_by(compare_vendor_syntax);
    Ok(())
}
