//! Instruction record model shared by the cleanup transforms.
//!
//! A record pairs the vendor syntax of one instruction form (mnemonic plus ordered operands)
//! with its encoding, first as the raw token string copied from the manual and, once that
//! string has been parsed upstream, as an [`EncodingSpecification`].

pub mod builder;
pub mod family;
pub mod specification;

use smallvec::SmallVec;

use crate::isa::error::IsaError;

pub use builder::RecordBuilder;
pub use family::{OpcodeFamilyKey, group_by_family};
pub use specification::{
    EncodingSpecification, LegacyPrefixes, ModRmUsage, PrefixEncoding, PrefixKind, PrefixUsage,
    VexMandatoryPrefix, VexMapSelect, VexOperandUsage, VexPrefix, VexPrefixType, VexVectorSize,
    VexWUsage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressingMode {
    #[default]
    Unspecified,
    NoAddressing,
    DirectAddressing,
    AnyAddressingWithFlexibleRegisters,
    AnyAddressingWithFixedRegisters,
    IndirectAddressing,
    LoadEffectiveAddress,
}

/// Where an operand lives in the encoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandEncoding {
    #[default]
    Unspecified,
    ModRmRegEncoding,
    ModRmRmEncoding,
    ImmediateValueEncoding,
    OpcodeEncoding,
    VexVEncoding,
    ImplicitEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandUsage {
    #[default]
    Unspecified,
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operand {
    pub name: String,
    pub addressing_mode: AddressingMode,
    pub encoding: OperandEncoding,
    pub usage: OperandUsage,
    pub value_size_bits: u32,
}

impl Operand {
    pub fn new(name: impl Into<String>, usage: OperandUsage, value_size_bits: u32) -> Self {
        Self {
            name: name.into(),
            usage,
            value_size_bits,
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, addressing_mode: AddressingMode, encoding: OperandEncoding) -> Self {
        self.addressing_mode = addressing_mode;
        self.encoding = encoding;
        self
    }
}

/// One instruction form together with its (possibly partial) encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionRecord {
    pub mnemonic: String,
    pub operands: SmallVec<[Operand; 4]>,
    pub description: Option<String>,
    /// Human-readable encoding tokens, e.g. `66 81 /2 iw`.
    pub raw_spec: String,
    /// Present only once `raw_spec` was parsed successfully.
    pub structured_spec: Option<EncodingSpecification>,
    pub available_in_64_bit: bool,
    /// Usable outside 64-bit mode.
    pub legacy_instruction: bool,
    pub feature_name: Option<String>,
}

impl InstructionRecord {
    pub fn builder(mnemonic: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(mnemonic)
    }

    pub fn legacy_prefixes(&self) -> Option<&LegacyPrefixes> {
        self.structured_spec
            .as_ref()
            .and_then(EncodingSpecification::legacy_prefixes)
    }

    pub fn legacy_prefixes_mut(&mut self) -> Option<&mut LegacyPrefixes> {
        self.structured_spec
            .as_mut()
            .and_then(EncodingSpecification::legacy_prefixes_mut)
    }

    pub fn is_legacy_encoded(&self) -> bool {
        self.legacy_prefixes().is_some()
    }

    pub fn has_operand_of_size(&self, bits: u32) -> bool {
        self.operands.iter().any(|op| op.value_size_bits == bits)
    }

    /// Validates the structured specification, if any.
    pub fn check_structured_spec(&self) -> Result<(), IsaError> {
        match &self.structured_spec {
            Some(spec) => spec
                .check()
                .map_err(|reason| IsaError::malformed(&self.mnemonic, &self.raw_spec, reason)),
            None => Ok(()),
        }
    }

    /// Renders `MNEMONIC op1, op2` for log messages.
    pub fn syntax(&self) -> String {
        if self.operands.is_empty() {
            return self.mnemonic.clone();
        }
        let operands: Vec<&str> = self.operands.iter().map(|op| op.name.as_str()).collect();
        format!("{} {}", self.mnemonic, operands.join(", "))
    }
}

/// The collection of records the cleanup pipeline operates on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionSet {
    pub instructions: Vec<InstructionRecord>,
}

impl InstructionSet {
    pub fn new(instructions: Vec<InstructionRecord>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn push(&mut self, record: InstructionRecord) {
        self.instructions.push(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionRecord> {
        self.instructions.iter()
    }
}

impl FromIterator<InstructionRecord> for InstructionSet {
    fn from_iter<I: IntoIterator<Item = InstructionRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
