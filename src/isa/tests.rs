use crate::isa::cleanup::{LogOptions, PipelineConfig, TransformRegistry, run_pipeline};
use crate::isa::encoding::{
    EncodingSpecification, InstructionRecord, InstructionSet, Operand, OperandUsage, PrefixKind,
    PrefixUsage, VexPrefix,
};

fn record(mnemonic: &str, operands: &[(&str, u32)], raw: &str, spec: EncodingSpecification) -> InstructionRecord {
    InstructionRecord::builder(mnemonic)
        .operands(
            operands
                .iter()
                .map(|(name, bits)| Operand::new(*name, OperandUsage::Read, *bits)),
        )
        .raw_spec(raw)
        .structured(spec)
        .finish()
}

fn parsed_fixture() -> InstructionSet {
    InstructionSet::new(vec![
        record("STOSD", &[], "AB", EncodingSpecification::legacy(0xAB)),
        record(
            "ADC",
            &[("RAX", 64), ("imm32", 32)],
            "REX.W + 15 id",
            EncodingSpecification::legacy(0x15)
                .with_immediate_bytes(4)
                .with_prefix(PrefixKind::RexW, PrefixUsage::Required),
        ),
        record(
            "ANDN",
            &[("r32a", 32), ("r32b", 32), ("r/m32", 32)],
            "VEX.NDS.LZ.0F38.0 F2 /r",
            EncodingSpecification::vex(0x0F38F2, VexPrefix::default()),
        ),
        record(
            "ADC",
            &[("AX", 16), ("imm16", 16)],
            "15 iw",
            EncodingSpecification::legacy(0x15).with_immediate_bytes(2),
        ),
        record("CPUID", &[], "0F A2", EncodingSpecification::legacy(0x0FA2)),
        record(
            "ADC",
            &[("EAX", 32), ("imm32", 32)],
            "15 id",
            EncodingSpecification::legacy(0x15).with_immediate_bytes(4),
        ),
        record("STOSW", &[], "AB", EncodingSpecification::legacy(0xAB)),
    ])
}

fn run_x86(set: &mut InstructionSet, config: &PipelineConfig) {
    let registry = TransformRegistry::x86().expect("x86 registry");
    run_pipeline(&registry.default_pipeline(), set, config).expect("pipeline");
}

#[test]
fn x86_pipeline_normalizes_parsed_records() {
    let mut set = parsed_fixture();
    run_x86(&mut set, &PipelineConfig::quiet());

    let summary: Vec<(String, &str, Option<(PrefixUsage, PrefixUsage)>)> = set
        .iter()
        .map(|r| {
            (
                r.syntax(),
                r.raw_spec.as_str(),
                r.legacy_prefixes().map(|p| (p.operand_size_override, p.rex_w)),
            )
        })
        .collect();
    use PrefixUsage::{Ignored, NotPermitted, Required};
    assert_eq!(
        summary,
        vec![
            ("ADC AX, imm16".to_string(), "66 15 iw", Some((Required, NotPermitted))),
            ("ADC EAX, imm32".to_string(), "15 id", Some((NotPermitted, NotPermitted))),
            ("ADC RAX, imm32".to_string(), "REX.W + 15 id", Some((NotPermitted, Required))),
            ("ANDN r32a, r32b, r/m32".to_string(), "VEX.NDS.LZ.0F38.W0 F2 /r", None),
            ("CPUID".to_string(), "0F A2", Some((Ignored, Ignored))),
            ("STOSD".to_string(), "AB", Some((NotPermitted, Ignored))),
            ("STOSW".to_string(), "66 AB", Some((Required, Ignored))),
        ]
    );
}

#[test]
fn x86_pipeline_is_idempotent() {
    let mut once = parsed_fixture();
    run_x86(&mut once, &PipelineConfig::quiet());
    let mut twice = once.clone();
    run_x86(&mut twice, &PipelineConfig::default().with_log(LogOptions::all()));
    assert_eq!(once, twice, "a second run must not change anything");
}
