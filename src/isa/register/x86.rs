//! The x86-64 register catalog.

use super::{
    Register, RegisterBuilder, RegisterClass, RegisterGroup, RegisterSet, RegisterTemplate,
    registers_from_base_name_and_indices, registers_from_base_names,
};
use crate::isa::error::IsaError;

use RegisterClass::*;

fn general_purpose_registers() -> Result<RegisterSet, IsaError> {
    let mut set = registers_from_base_names(
        &[
            RegisterTemplate::new("R", "X", 0, 63, GeneralPurpose64),
            RegisterTemplate::new("E", "X", 0, 31, GeneralPurpose32),
            RegisterTemplate::new("", "X", 0, 15, GeneralPurpose16),
            RegisterTemplate::new("", "L", 0, 7, GeneralPurpose8),
            RegisterTemplate::new("", "H", 8, 15, GeneralPurpose8).with_encoding_offset(4),
        ],
        &["A", "C", "D", "B"],
        0,
    )?;
    set.merge(registers_from_base_names(
        &[
            RegisterTemplate::new("R", "", 0, 63, GeneralPurpose64),
            RegisterTemplate::new("E", "", 0, 31, GeneralPurpose32),
            RegisterTemplate::new("", "", 0, 15, GeneralPurpose16),
            RegisterTemplate::new("", "L", 0, 7, GeneralPurpose8),
        ],
        &["SP", "BP", "SI", "DI"],
        4,
    )?);
    set.merge(registers_from_base_name_and_indices(
        &[
            RegisterTemplate::new("", "", 0, 63, GeneralPurpose64),
            RegisterTemplate::new("", "D", 0, 31, GeneralPurpose32),
            RegisterTemplate::new("", "W", 0, 15, GeneralPurpose16),
            RegisterTemplate::new("", "B", 0, 7, GeneralPurpose8),
        ],
        "R",
        8,
        16,
        8,
    )?);
    Ok(set)
}

fn control_registers() -> Result<RegisterSet, IsaError> {
    registers_from_base_name_and_indices(&[RegisterTemplate::new("", "", 0, 63, SpecialControl)], "CR", 0, 9, 0)
}

fn debug_registers() -> Result<RegisterSet, IsaError> {
    registers_from_base_name_and_indices(&[RegisterTemplate::new("", "", 0, 63, SpecialDebug)], "DR", 0, 9, 0)
}

fn with_flags(register: RegisterBuilder, msb: u32) -> RegisterBuilder {
    register
        .described_subfield(0, 0, "CF", "The carry flag.")
        .subfield(1, 1, "reserved")
        .described_subfield(2, 2, "PF", "The parity flag.")
        .subfield(3, 3, "reserved")
        .described_subfield(4, 4, "AF", "The auxiliary carry flag.")
        .subfield(5, 5, "reserved")
        .described_subfield(6, 6, "ZF", "The zero flag.")
        .described_subfield(7, 7, "SF", "The sign flag.")
        .described_subfield(8, 8, "TF", "The trap flag.")
        .described_subfield(9, 9, "IF", "The interrupt enable flag.")
        .described_subfield(10, 10, "DF", "The direction flag.")
        .described_subfield(11, 11, "OF", "The overflow flag.")
        .described_subfield(12, 13, "IOPL", "The IO privilege level.")
        .described_subfield(14, 14, "NT", "The nested task.")
        .subfield(15, 15, "reserved")
        .described_subfield(16, 16, "RF", "The resume flag.")
        .described_subfield(17, 17, "VM", "The virtual-8086 mode.")
        .described_subfield(18, 18, "AC", "The alignment check/access control.")
        .described_subfield(19, 19, "VIF", "The virtual interrupt flag.")
        .described_subfield(20, 20, "VIP", "Virtual interrupt pending.")
        .described_subfield(21, 21, "ID", "The ID flag.")
        .subfield(22, msb, "reserved")
}

fn flags_registers() -> Result<RegisterSet, IsaError> {
    let flags = |name: &str, msb| {
        with_flags(Register::builder(name, 0, msb).class(SpecialFlags).implicit_only(), msb).finish()
    };
    let group = RegisterGroup::builder("RFLAGS group", "The flags registers")
        .register(flags("EFLAGS", 31))
        .register(flags("RFLAGS", 63))
        .build()?;
    Ok(std::iter::once(group).collect())
}

fn fpu_status_word() -> Register {
    // FPSW is not an SDM name; LLVM uses it for the x87 status word.
    Register::builder("FPSW", 0, 15)
        .class(SpecialFlags)
        .implicit_only()
        .described_subfield(0, 0, "IE", "Invalid Operation")
        .described_subfield(1, 1, "DE", "Denormalized Operand")
        .described_subfield(2, 2, "ZE", "Zero Divide")
        .described_subfield(3, 3, "OE", "Overflow")
        .described_subfield(4, 4, "UE", "Underflow")
        .described_subfield(5, 5, "PE", "Precision")
        .described_subfield(6, 6, "SF", "Stack Fault")
        .described_subfield(7, 7, "ES", "Exception Summary Status")
        .described_subfield(8, 10, "C0-C2", "Condition Code 0-2")
        .described_subfield(11, 13, "TOP", "Top of Stack Pointer")
        .described_subfield(14, 14, "C3", "Condition Code 3")
        .described_subfield(15, 15, "B", "FPU Busy")
        .finish()
}

fn fpu_control_word() -> Register {
    Register::builder("FPCW", 0, 15)
        .class(SpecialFlags)
        .implicit_only()
        .described_subfield(0, 0, "IM", "Invalid Operation Mask")
        .described_subfield(1, 1, "DM", "Denormalized Operand Mask")
        .described_subfield(2, 2, "ZM", "Zero Divide Mask")
        .described_subfield(3, 3, "OM", "Overflow Mask")
        .described_subfield(4, 4, "UM", "Underflow Mask")
        .described_subfield(5, 5, "PM", "Precision Mask")
        .subfield(6, 7, "reserved")
        .described_subfield(8, 9, "PC", "Precision Control")
        .described_subfield(10, 11, "RC", "Rounding Control")
        .described_subfield(12, 12, "X", "Infinity Control")
        .subfield(13, 15, "reserved")
        .finish()
}

fn fpu_and_mmx_registers() -> Result<RegisterSet, IsaError> {
    let mut set = registers_from_base_name_and_indices(
        &[
            RegisterTemplate::new("ST", "", 0, 79, FloatingPointStack).with_feature("FPU"),
            RegisterTemplate::new("MM", "", 0, 63, MmxStack).with_feature("MMX"),
        ],
        "",
        0,
        8,
        0,
    )?;
    set.push(
        RegisterGroup::builder("FPU status word", "The x87 FPU status word.")
            .register(fpu_status_word())
            .build()?,
    );
    set.push(
        RegisterGroup::builder("FPU control word", "The x87 FPU control word.")
            .register(fpu_control_word())
            .build()?,
    );
    Ok(set)
}

fn opmask_registers() -> Result<RegisterSet, IsaError> {
    registers_from_base_name_and_indices(
        &[RegisterTemplate::new("", "", 0, 63, Opmask).with_feature("AVX512")],
        "k",
        0,
        8,
        0,
    )
}

fn segment_registers() -> Result<RegisterSet, IsaError> {
    registers_from_base_names(
        &[RegisterTemplate::new("", "S", 0, 15, SpecialSegment)],
        &["E", "C", "S", "D", "F", "G"],
        0,
    )
}

fn mxcsr() -> Register {
    Register::builder("MXCSR", 0, 31)
        .class(SpecialFlags)
        .implicit_only()
        .description("The SIMD floating point operation control register.")
        .described_subfield(0, 0, "IE", "Invalid Operation Flag")
        .described_subfield(1, 1, "DE", "Denormal Flag")
        .described_subfield(2, 2, "ZE", "Divide-by-zero Flag")
        .described_subfield(3, 3, "OE", "Overflow Flag")
        .described_subfield(4, 4, "UE", "Underflow Flag")
        .described_subfield(5, 5, "PE", "Precision Flag")
        .described_subfield(6, 6, "DAZ", "Denormals Are Zeros")
        .described_subfield(7, 7, "IM", "Invalid Operation Mask")
        .described_subfield(8, 8, "DM", "Denormal Operation Mask")
        .described_subfield(9, 9, "ZM", "Divide-by-zero Mask")
        .described_subfield(10, 10, "OM", "Overflow Mask")
        .described_subfield(11, 11, "UM", "Underflow Mask")
        .described_subfield(12, 12, "PM", "Precision Mask")
        .described_subfield(13, 14, "RC", "Rounding Control")
        .described_subfield(15, 15, "FZ", "Flush to Zero")
        .subfield(16, 31, "reserved")
        .finish()
}

fn vector_registers() -> Result<RegisterSet, IsaError> {
    let mut set: RegisterSet = std::iter::once(
        RegisterGroup::builder("MXCSR group", "The SIMD floating point operation control register.")
            .register(mxcsr())
            .build()?,
    )
    .collect();
    set.merge(registers_from_base_name_and_indices(
        &[
            RegisterTemplate::new("X", "", 0, 127, Vector128).with_feature("SSE"),
            RegisterTemplate::new("Y", "", 0, 255, Vector256).with_feature("AVX"),
            RegisterTemplate::new("Z", "", 0, 511, Vector512).with_feature("AVX512"),
        ],
        "MM",
        0,
        16,
        0,
    )?);
    // 16-31 are reachable only through EVEX.
    set.merge(registers_from_base_name_and_indices(
        &[
            RegisterTemplate::new("X", "", 0, 127, Vector128).with_feature("AVX512"),
            RegisterTemplate::new("Y", "", 0, 255, Vector256).with_feature("AVX512"),
            RegisterTemplate::new("Z", "", 0, 511, Vector512).with_feature("AVX512"),
        ],
        "MM",
        16,
        32,
        16,
    )?);
    Ok(set)
}

fn mpx_registers() -> Result<RegisterSet, IsaError> {
    let mut set = registers_from_base_name_and_indices(
        &[RegisterTemplate::new("", "", 0, 127, SpecialMpxBounds).with_feature("MPX")],
        "BND",
        0,
        4,
        0,
    )?;
    let config = |name: &str, description: &str| {
        Register::builder(name, 0, 63)
            .class(SpecialMpxBounds)
            .implicit_only()
            .feature("MPX")
            .description(description)
            .described_subfield(0, 0, "En", "Enable Intel MPX")
            .described_subfield(1, 1, "BNDPRESERVE", "Preserve the bound registers on branches")
            .subfield(2, 11, "reserved")
            .described_subfield(12, 63, "Base", "Base of the bound directory")
            .finish()
    };
    let status = Register::builder("BNDSTATUS", 0, 63)
        .class(SpecialMpxBounds)
        .implicit_only()
        .feature("MPX")
        .description("The MPX bound status register.")
        .described_subfield(0, 1, "EC", "Error Code")
        .described_subfield(2, 63, "ABD", "Address of the Bound Directory entry")
        .finish();
    for register in [
        config("BNDCFGU", "The user-mode MPX configuration register."),
        config("BNDCFGS", "The supervisor-mode MPX configuration register."),
        status,
    ] {
        let name = register.name.clone();
        set.push(
            RegisterGroup::builder(format!("{name} group"), format!("The group of registers aliased with {name}"))
                .register(register)
                .build()?,
        );
    }
    Ok(set)
}

fn memory_management_registers() -> Result<RegisterSet, IsaError> {
    [
        ("GDTR", "The Global Descriptor Table Register group"),
        ("LDTR", "The Local Descriptor Table Register group"),
        ("IDTR", "The Interrupt Descriptor Table Register group"),
        ("TR", "The Task Register group"),
    ]
    .into_iter()
    .map(|(name, description)| {
        RegisterGroup::builder(format!("{name} group"), description)
            .register(Register::builder(name, 0, 63).class(SpecialMemoryManagement).finish())
            .build()
    })
    .collect::<Result<Vec<_>, _>>()
    .map(|groups| groups.into_iter().collect())
}

/// Builds the full x86-64 register set. Prefer [`super::RegisterCatalog::x86`], which also
/// validates the result.
pub fn register_set() -> Result<RegisterSet, IsaError> {
    let mut set = general_purpose_registers()?;
    set.merge(control_registers()?);
    set.merge(debug_registers()?);
    set.merge(flags_registers()?);
    set.merge(fpu_and_mmx_registers()?);
    set.merge(opmask_registers()?);
    set.merge(segment_registers()?);
    set.merge(vector_registers()?);
    set.merge(mpx_registers()?);
    set.merge(memory_management_registers()?);
    Ok(set)
}
