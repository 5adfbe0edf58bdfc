fn mask_for_width(width: u32) -> u64 {
    if width == 0 {
        0
    } else if width >= 64 {
        u64::MAX
    } else {
        ((1u128 << width) - 1) as u64
    }
}

/// Inclusive bit range `[lsb, msb]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitRange {
    pub lsb: u32,
    pub msb: u32,
}

impl BitRange {
    pub const fn new(lsb: u32, msb: u32) -> Self {
        Self { lsb, msb }
    }

    pub const fn bit(index: u32) -> Self {
        Self::new(index, index)
    }

    pub fn is_valid(&self) -> bool {
        self.lsb <= self.msb
    }

    /// Number of bits covered; zero for an inverted range.
    pub fn width(&self) -> u32 {
        if self.is_valid() {
            self.msb - self.lsb + 1
        } else {
            0
        }
    }

    pub fn contains(&self, other: &BitRange) -> bool {
        self.lsb <= other.lsb && other.msb <= self.msb
    }

    pub fn overlaps(&self, other: &BitRange) -> bool {
        self.lsb <= other.msb && other.lsb <= self.msb
    }

    /// Mask of the covered bits within a 64-bit word. Bits at index 64 and above are dropped.
    pub fn mask(&self) -> u64 {
        if self.lsb >= 64 {
            return 0;
        }
        mask_for_width(self.width()) << self.lsb
    }

    /// Extracts the covered bits of `value`, shifted down to bit 0.
    pub fn extract(&self, value: u64) -> u64 {
        if self.lsb >= 64 {
            return 0;
        }
        (value & self.mask()) >> self.lsb
    }
}

impl std::fmt::Display for BitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lsb == self.msb {
            write!(f, "[{}]", self.lsb)
        } else {
            write!(f, "[{}:{}]", self.msb, self.lsb)
        }
    }
}
