use isaspec::isa::cleanup::{LogOptions, RegisteredTransform, run_pipeline, run_transform_with_diff};
use isaspec::isa::encoding::{EncodingSpecification, PrefixKind, PrefixUsage};
use isaspec::{InstructionSet, IsaError, PipelineConfig, TransformRegistry};

use crate::common::{self, described, parsed, unparsed};

fn textual_stage(registry: &TransformRegistry) -> Vec<RegisteredTransform> {
    registry
        .default_pipeline()
        .into_iter()
        .filter(|entry| entry.rank == Some(1000))
        .collect()
}

#[test]
fn textual_fixes_run_before_parsing() {
    common::init_logging();
    let registry = TransformRegistry::x86().expect("x86 registry");
    let mut set: InstructionSet = [
        described(
            unparsed("POP", &[("FS", 16)], "0F A1"),
            "Pop top of stack into FS; increment stack pointer by 16 bits.",
        ),
        described(
            unparsed("POP", &[("FS", 64)], "0F A1"),
            "Pop top of stack into FS; increment stack pointer by 64 bits.",
        ),
        unparsed("PUSH", &[("GS", 64)], "0F A8"),
        unparsed("MOV", &[("AL", 8), ("moffs8", 8)], "A0"),
        unparsed("VMOVD", &[("xmm1", 128), ("r32", 32)], "VEX.128.66.0F.0 6E"),
    ]
    .into_iter()
    .collect();

    run_pipeline(&textual_stage(&registry), &mut set, &PipelineConfig::default()).expect("textual stage");

    let raw: Vec<&str> = set.iter().map(|r| r.raw_spec.as_str()).collect();
    assert_eq!(
        raw,
        vec![
            "66 0F A1",
            "0F A1",
            "0F A8",
            "A0 io",
            "VEX.128.66.0F.W0 6E /r",
            "67 A0 id",
            "REX.W 0F A1",
            "66 0F A8",
            "REX.W 0F A8",
        ]
    );
}

#[test]
fn unparsed_records_stop_the_full_pipeline() {
    common::init_logging();
    let registry = TransformRegistry::x86().expect("x86 registry");
    let mut set: InstructionSet = std::iter::once(unparsed("STOSW", &[], "AB")).collect();

    let err = run_pipeline(&registry.default_pipeline(), &mut set, &PipelineConfig::quiet())
        .expect_err("clustering needs parsed encodings");
    match err {
        IsaError::Transform { name, source } => {
            assert_eq!(name, "add_operand_size_override_prefix");
            assert!(matches!(*source, IsaError::MissingEncoding { ref mnemonic, .. } if mnemonic == "STOSW"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(set.instructions[0].raw_spec, "AB", "implicit-operand pass skips unparsed records");
}

#[test]
fn operand_size_families_with_diff_logging() {
    common::init_logging();
    let registry = TransformRegistry::x86().expect("x86 registry");
    let mut set: InstructionSet = [
        parsed(
            "OUT",
            &[("DX", 16), ("AX", 16)],
            "EF",
            EncodingSpecification::legacy(0xEF),
        ),
        parsed(
            "OUT",
            &[("DX", 16), ("EAX", 32)],
            "EF",
            EncodingSpecification::legacy(0xEF),
        ),
        parsed(
            "PUSH",
            &[("r/m16", 16)],
            "FF /6",
            EncodingSpecification::legacy(0xFF)
                .with_opcode_extension(6),
        ),
        parsed(
            "PUSH",
            &[("r/m64", 64)],
            "FF /6",
            EncodingSpecification::legacy(0xFF)
                .with_opcode_extension(6)
                .with_prefix(PrefixKind::OperandSizeOverride, PrefixUsage::NotPermitted),
        ),
    ]
    .into_iter()
    .collect();

    let config = PipelineConfig::default().with_log(LogOptions::TRANSFORM_NAMES | LogOptions::TRANSFORM_DIFFS);
    run_pipeline(&registry.default_pipeline(), &mut set, &config).expect("pipeline");

    let summary: Vec<(String, &str, PrefixUsage)> = set
        .iter()
        .map(|r| {
            (
                r.syntax(),
                r.raw_spec.as_str(),
                r.legacy_prefixes().expect("legacy").operand_size_override,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("OUT DX, AX".to_string(), "66 EF", PrefixUsage::Required),
            ("OUT DX, EAX".to_string(), "EF", PrefixUsage::NotPermitted),
            ("PUSH r/m16".to_string(), "66 FF /6", PrefixUsage::Required),
            ("PUSH r/m64".to_string(), "FF /6", PrefixUsage::NotPermitted),
        ]
    );
}

#[test]
fn single_transform_reports_its_changes() {
    let registry = TransformRegistry::x86().expect("x86 registry");
    let entry = registry.by_name("normalize_lig_flag").expect("registered");
    let mut set: InstructionSet = [
        unparsed("VADDSD", &[], "EVEX.LLIG.F2.0F.W1 58 /r"),
        unparsed("ADD", &[], "04 ib"),
    ]
    .into_iter()
    .collect();

    let changes = run_transform_with_diff(entry.transform, &mut set).expect("transform");
    let rendered: Vec<String> = changes.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["- VADDSD [EVEX.LLIG.F2.0F.W1 58 /r]", "+ VADDSD [EVEX.LIG.F2.0F.W1 58 /r]"]
    );
}
