use isaspec::isa::encoding::{EncodingSpecification, InstructionRecord, Operand, OperandUsage};

/// Routes `tracing` output to the test harness when `SHOW_TRANSFORMS` is set.
pub fn init_logging() {
    if std::env::var_os("SHOW_TRANSFORMS").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn unparsed(mnemonic: &str, operands: &[(&str, u32)], raw_spec: &str) -> InstructionRecord {
    InstructionRecord::builder(mnemonic)
        .operands(
            operands
                .iter()
                .map(|(name, bits)| Operand::new(*name, OperandUsage::Read, *bits)),
        )
        .raw_spec(raw_spec)
        .finish()
}

pub fn parsed(
    mnemonic: &str,
    operands: &[(&str, u32)],
    raw_spec: &str,
    spec: EncodingSpecification,
) -> InstructionRecord {
    let mut record = unparsed(mnemonic, operands, raw_spec);
    record.structured_spec = Some(spec);
    record
}

pub fn described(mut record: InstructionRecord, description: &str) -> InstructionRecord {
    record.description = Some(description.to_string());
    record
}
