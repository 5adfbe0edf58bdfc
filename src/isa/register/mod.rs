//! Register model.
//!
//! Registers that alias the same physical storage (AL, AH, AX, EAX and RAX) live in one
//! [`RegisterGroup`]. Each register states the bits of the group storage it occupies; aliasing is
//! expressed purely through overlapping [`BitRange`]s. Subfields (flags, status bits) are ranges
//! relative to bit 0 of their register.

pub mod bits;
pub mod builder;
pub mod catalog;
pub mod validator;
pub mod x86;

use smallvec::SmallVec;

use crate::isa::diagnostic::DiagnosticPhase;
use crate::isa::error::IsaError;

pub use bits::BitRange;
pub use builder::{RegisterTemplate, registers_from_base_name_and_indices, registers_from_base_names};
pub use catalog::RegisterCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    #[default]
    Unknown,
    GeneralPurpose8,
    GeneralPurpose16,
    GeneralPurpose32,
    GeneralPurpose64,
    Vector128,
    Vector256,
    Vector512,
    FloatingPointStack,
    MmxStack,
    Opmask,
    SpecialSegment,
    SpecialControl,
    SpecialDebug,
    SpecialFlags,
    SpecialMpxBounds,
    SpecialMemoryManagement,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subfield {
    pub name: String,
    pub range: BitRange,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    pub name: String,
    /// Value of the register in the ModR/M, SIB or VEX fields; `None` for registers that can only
    /// be used implicitly.
    pub binary_encoding: Option<u32>,
    pub register_class: RegisterClass,
    pub implicit_encoding_only: bool,
    pub feature_name: Option<String>,
    /// Bits of the group storage the register occupies.
    pub position: BitRange,
    pub description: Option<String>,
    pub subfields: Vec<Subfield>,
}

impl Register {
    pub fn builder(name: impl Into<String>, lsb: u32, msb: u32) -> RegisterBuilder {
        RegisterBuilder {
            register: Register {
                name: name.into(),
                binary_encoding: None,
                register_class: RegisterClass::Unknown,
                implicit_encoding_only: false,
                feature_name: None,
                position: BitRange::new(lsb, msb),
                description: None,
                subfields: Vec::new(),
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.position.width()
    }

    pub fn subfield(&self, name: &str) -> Option<&Subfield> {
        self.subfields.iter().find(|field| field.name == name)
    }

    /// Reads subfield `name` out of a register value. Only meaningful for registers of at most
    /// 64 bits.
    pub fn read_subfield(&self, name: &str, value: u64) -> Option<u64> {
        self.subfield(name).map(|field| field.range.extract(value))
    }
}

pub struct RegisterBuilder {
    register: Register,
}

impl RegisterBuilder {
    pub fn encoding(mut self, encoding: u32) -> Self {
        self.register.binary_encoding = Some(encoding);
        self
    }

    pub fn class(mut self, class: RegisterClass) -> Self {
        self.register.register_class = class;
        self
    }

    pub fn implicit_only(mut self) -> Self {
        self.register.implicit_encoding_only = true;
        self
    }

    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.register.feature_name = Some(feature.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.register.description = Some(description.into());
        self
    }

    pub fn subfield(mut self, lsb: u32, msb: u32, name: impl Into<String>) -> Self {
        self.register.subfields.push(Subfield {
            name: name.into(),
            range: BitRange::new(lsb, msb),
            description: None,
        });
        self
    }

    pub fn described_subfield(
        mut self,
        lsb: u32,
        msb: u32,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.register.subfields.push(Subfield {
            name: name.into(),
            range: BitRange::new(lsb, msb),
            description: Some(description.into()),
        });
        self
    }

    pub fn finish(self) -> Register {
        self.register
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterGroup {
    pub name: String,
    pub description: String,
    pub registers: SmallVec<[Register; 4]>,
}

impl RegisterGroup {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> RegisterGroupBuilder {
        RegisterGroupBuilder {
            group: RegisterGroup {
                name: name.into(),
                description: description.into(),
                registers: SmallVec::new(),
            },
        }
    }

    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|reg| reg.name == name)
    }
}

/// Collects registers for one group; [`RegisterGroupBuilder::build`] reports every malformed
/// register at once. Warnings are logged and do not fail the build.
pub struct RegisterGroupBuilder {
    group: RegisterGroup,
}

impl RegisterGroupBuilder {
    pub fn register(mut self, register: Register) -> Self {
        self.group.registers.push(register);
        self
    }

    pub fn build(self) -> Result<RegisterGroup, IsaError> {
        let mut diagnostics = Vec::new();
        validator::check_group(&self.group, DiagnosticPhase::RegisterBuild, &mut diagnostics);
        validator::into_result(DiagnosticPhase::RegisterBuild, diagnostics)?;
        Ok(self.group)
    }
}

/// Ordered collection of register groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterSet {
    pub groups: Vec<RegisterGroup>,
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: RegisterGroup) {
        self.groups.push(group);
    }

    /// Appends the groups of `other`. Groups are not de-duplicated.
    pub fn merge(&mut self, other: RegisterSet) {
        self.groups.extend(other.groups);
    }

    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.groups.iter().flat_map(|group| group.registers.iter())
    }

    pub fn find_group_by_register(&self, name: &str) -> Option<&RegisterGroup> {
        self.groups.iter().find(|group| group.register(name).is_some())
    }

    pub fn find_register(&self, name: &str) -> Option<&Register> {
        self.registers().find(|reg| reg.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&RegisterGroup> {
        self.groups.iter().find(|group| group.name == name)
    }
}

impl FromIterator<RegisterGroup> for RegisterSet {
    fn from_iter<I: IntoIterator<Item = RegisterGroup>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}
