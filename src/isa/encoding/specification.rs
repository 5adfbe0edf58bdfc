//! Structured form of an instruction's binary encoding: opcode, ModR/M usage, immediates, and
//! either the legacy prefix table or a VEX/EVEX prefix descriptor.

/// The largest opcode the structured form can hold (three opcode bytes, e.g. `0F 38 F2`).
pub const MAX_OPCODE: u32 = 0x00FF_FFFF;

/// How a legacy prefix participates in an instruction's encoding.
///
/// Any value other than [`PrefixUsage::Unspecified`] is an explicit statement about the
/// instruction and is never overwritten by the cleanup transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrefixUsage {
    #[default]
    Unspecified,
    Required,
    NotPermitted,
    /// The prefix may be present or absent without changing the instruction.
    Ignored,
}

impl PrefixUsage {
    pub fn is_unspecified(self) -> bool {
        matches!(self, PrefixUsage::Unspecified)
    }
}

/// Legacy prefixes that carry a [`PrefixUsage`] in [`LegacyPrefixes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrefixKind {
    RexW,
    OperandSizeOverride,
    AddressSizeOverride,
    Lock,
    Repe,
    Repne,
    SegmentOverride,
}

impl PrefixKind {
    pub const ALL: [PrefixKind; 7] = [
        PrefixKind::RexW,
        PrefixKind::OperandSizeOverride,
        PrefixKind::AddressSizeOverride,
        PrefixKind::Lock,
        PrefixKind::Repe,
        PrefixKind::Repne,
        PrefixKind::SegmentOverride,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrefixKind::RexW => "REX.W",
            PrefixKind::OperandSizeOverride => "operand-size override",
            PrefixKind::AddressSizeOverride => "address-size override",
            PrefixKind::Lock => "LOCK",
            PrefixKind::Repe => "REPE",
            PrefixKind::Repne => "REPNE",
            PrefixKind::SegmentOverride => "segment override",
        }
    }
}

/// Usage of each legacy prefix for a legacy-encoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegacyPrefixes {
    pub rex_w: PrefixUsage,
    pub operand_size_override: PrefixUsage,
    pub address_size_override: PrefixUsage,
    pub lock: PrefixUsage,
    pub repe: PrefixUsage,
    pub repne: PrefixUsage,
    pub segment_override: PrefixUsage,
}

impl LegacyPrefixes {
    pub fn get(&self, kind: PrefixKind) -> PrefixUsage {
        match kind {
            PrefixKind::RexW => self.rex_w,
            PrefixKind::OperandSizeOverride => self.operand_size_override,
            PrefixKind::AddressSizeOverride => self.address_size_override,
            PrefixKind::Lock => self.lock,
            PrefixKind::Repe => self.repe,
            PrefixKind::Repne => self.repne,
            PrefixKind::SegmentOverride => self.segment_override,
        }
    }

    pub fn set(&mut self, kind: PrefixKind, usage: PrefixUsage) {
        let slot = match kind {
            PrefixKind::RexW => &mut self.rex_w,
            PrefixKind::OperandSizeOverride => &mut self.operand_size_override,
            PrefixKind::AddressSizeOverride => &mut self.address_size_override,
            PrefixKind::Lock => &mut self.lock,
            PrefixKind::Repe => &mut self.repe,
            PrefixKind::Repne => &mut self.repne,
            PrefixKind::SegmentOverride => &mut self.segment_override,
        };
        *slot = usage;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexPrefixType {
    #[default]
    Vex,
    Evex,
}

/// Role of the register encoded in `VEX.vvvv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexOperandUsage {
    #[default]
    NoOperand,
    FirstSourceRegister,
    SecondSourceRegister,
    DestinationRegister,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexVectorSize {
    #[default]
    Ignored,
    BitIsZero,
    BitIsOne,
    Bits128,
    Bits256,
    Bits512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexMapSelect {
    #[default]
    Map0F,
    Map0F38,
    Map0F3A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexWUsage {
    #[default]
    Ignored,
    Zero,
    One,
}

/// Mandatory prefix folded into the `VEX.pp` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VexMandatoryPrefix {
    #[default]
    None,
    OperandSizeOverride,
    Repe,
    Repne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VexPrefix {
    pub prefix_type: VexPrefixType,
    pub operand_usage: VexOperandUsage,
    pub vector_size: VexVectorSize,
    pub map_select: VexMapSelect,
    pub w_usage: VexWUsage,
    pub mandatory_prefix: VexMandatoryPrefix,
}

/// Exactly one prefix scheme per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrefixEncoding {
    Legacy(LegacyPrefixes),
    Vex(VexPrefix),
}

impl Default for PrefixEncoding {
    fn default() -> Self {
        PrefixEncoding::Legacy(LegacyPrefixes::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModRmUsage {
    #[default]
    NoModRm,
    /// `/digit`: the `reg` field of ModR/M extends the opcode.
    OpcodeExtensionInModRm,
    /// `/r`: both ModR/M fields encode operands.
    FullModRm,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodingSpecification {
    pub opcode: u32,
    pub modrm_usage: ModRmUsage,
    pub modrm_opcode_extension: Option<u8>,
    pub immediate_bytes: u8,
    pub code_offset_bytes: u8,
    pub prefixes: PrefixEncoding,
}

impl EncodingSpecification {
    pub fn legacy(opcode: u32) -> Self {
        Self {
            opcode,
            ..Self::default()
        }
    }

    pub fn vex(opcode: u32, prefix: VexPrefix) -> Self {
        Self {
            opcode,
            prefixes: PrefixEncoding::Vex(prefix),
            ..Self::default()
        }
    }

    pub fn with_opcode_extension(mut self, extension: u8) -> Self {
        self.modrm_usage = ModRmUsage::OpcodeExtensionInModRm;
        self.modrm_opcode_extension = Some(extension);
        self
    }

    pub fn with_full_modrm(mut self) -> Self {
        self.modrm_usage = ModRmUsage::FullModRm;
        self.modrm_opcode_extension = None;
        self
    }

    pub fn with_immediate_bytes(mut self, bytes: u8) -> Self {
        self.immediate_bytes = bytes;
        self
    }

    pub fn with_code_offset_bytes(mut self, bytes: u8) -> Self {
        self.code_offset_bytes = bytes;
        self
    }

    pub fn with_prefix(mut self, kind: PrefixKind, usage: PrefixUsage) -> Self {
        if let Some(prefixes) = self.legacy_prefixes_mut() {
            prefixes.set(kind, usage);
        }
        self
    }

    pub fn legacy_prefixes(&self) -> Option<&LegacyPrefixes> {
        match &self.prefixes {
            PrefixEncoding::Legacy(prefixes) => Some(prefixes),
            PrefixEncoding::Vex(_) => None,
        }
    }

    pub fn legacy_prefixes_mut(&mut self) -> Option<&mut LegacyPrefixes> {
        match &mut self.prefixes {
            PrefixEncoding::Legacy(prefixes) => Some(prefixes),
            PrefixEncoding::Vex(_) => None,
        }
    }

    pub fn vex_prefix(&self) -> Option<&VexPrefix> {
        match &self.prefixes {
            PrefixEncoding::Vex(prefix) => Some(prefix),
            PrefixEncoding::Legacy(_) => None,
        }
    }

    /// Returns the ModR/M opcode extension that takes part in opcode family identity.
    pub fn family_extension(&self) -> Option<u8> {
        match self.modrm_usage {
            ModRmUsage::OpcodeExtensionInModRm => self.modrm_opcode_extension,
            _ => None,
        }
    }

    /// Checks the structural invariants every consumer of the structured form relies on.
    /// Returns a human-readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        if self.opcode > MAX_OPCODE {
            return Err(format!(
                "opcode {:#x} spans more than three bytes",
                self.opcode
            ));
        }
        match (self.modrm_usage, self.modrm_opcode_extension) {
            (ModRmUsage::OpcodeExtensionInModRm, None) => {
                Err("ModR/M opcode extension is missing".to_string())
            }
            (ModRmUsage::OpcodeExtensionInModRm, Some(ext)) if ext > 7 => Err(format!(
                "ModR/M opcode extension {ext} does not fit the 3-bit reg field"
            )),
            (ModRmUsage::OpcodeExtensionInModRm, Some(_)) => Ok(()),
            (usage, Some(ext)) => Err(format!(
                "ModR/M opcode extension {ext} given for {usage:?}"
            )),
            (_, None) => Ok(()),
        }
    }
}
