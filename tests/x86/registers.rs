use isaspec::isa::diagnostic::DiagnosticPhase;
use isaspec::isa::register::{
    BitRange, Register, RegisterClass, RegisterGroup, RegisterTemplate, registers_from_base_names,
};
use isaspec::{IsaError, RegisterCatalog, RegisterSet};

use crate::common;

#[test]
fn catalog_clones_share_storage() {
    common::init_logging();
    let catalog = RegisterCatalog::x86().expect("x86 catalog");
    let copy = catalog.clone();
    assert!(std::ptr::eq(catalog.register_set(), copy.register_set()));
    assert!(copy.find_group("RBX group").is_some());
    assert_eq!(copy.find_register("BH").and_then(|r| r.binary_encoding), Some(7));
}

#[test]
fn every_aliased_register_overlaps_its_group_root() {
    let catalog = RegisterCatalog::x86().expect("x86 catalog");
    for group in &catalog.groups {
        let root = group.registers.iter().max_by_key(|r| r.width()).expect("non-empty group");
        for register in &group.registers {
            assert!(
                root.position.overlaps(&register.position),
                "{} does not overlap {} in '{}'",
                register.name,
                root.name,
                group.name
            );
        }
    }
}

#[test]
fn mxcsr_rounding_control_reads_from_value() {
    let catalog = RegisterCatalog::x86().expect("x86 catalog");
    let mxcsr = catalog.find_register("MXCSR").expect("MXCSR");
    assert_eq!(mxcsr.register_class, RegisterClass::SpecialFlags);
    assert_eq!(mxcsr.subfield("RC").map(|f| f.range), Some(BitRange::new(13, 14)));
    // Power-on default with round-toward-zero selected.
    assert_eq!(mxcsr.read_subfield("RC", 0x1F80 | 0x6000), Some(3));
    assert_eq!(mxcsr.read_subfield("FZ", 0x1F80), Some(0));
}

#[test]
fn custom_sets_are_validated_on_catalog_creation() {
    let set = registers_from_base_names(
        &[
            RegisterTemplate::new("", "X", 0, 15, RegisterClass::GeneralPurpose16),
            RegisterTemplate::new("", "L", 0, 7, RegisterClass::GeneralPurpose8),
        ],
        &["A", "A"],
        0,
    )
    .expect("templates are well formed");

    let err = RegisterCatalog::new(set).expect_err("AX is defined twice");
    match &err {
        IsaError::Diagnostics { phase, diagnostics } => {
            assert_eq!(*phase, DiagnosticPhase::RegisterValidation);
            let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
            assert_eq!(codes, vec!["register.duplicate", "register.duplicate"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("register 'AX' is defined more than once"), "{err}");
}

#[test]
fn group_builder_rejects_out_of_range_subfields() {
    let err = RegisterGroup::builder("CTRL group", "A control register")
        .register(Register::builder("CTRL", 0, 7).subfield(6, 8, "MODE").finish())
        .build()
        .expect_err("MODE spills past bit 7");
    assert!(matches!(err, IsaError::Diagnostics { phase: DiagnosticPhase::RegisterBuild, .. }));

    let empty = RegisterCatalog::new(RegisterSet::new()).expect("an empty set is valid");
    assert!(empty.registers().next().is_none());
}
