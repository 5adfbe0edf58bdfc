use std::ops::Deref;
use std::sync::Arc;

use super::RegisterSet;
use super::validator::validate_register_set;
use crate::isa::error::IsaError;

/// Shared, read-only handle to a validated register set. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct RegisterCatalog {
    registers: Arc<RegisterSet>,
}

impl RegisterCatalog {
    pub fn new(registers: RegisterSet) -> Result<Self, IsaError> {
        validate_register_set(&registers)?;
        Ok(Self {
            registers: Arc::new(registers),
        })
    }

    /// Builds and validates the x86-64 register catalog.
    pub fn x86() -> Result<Self, IsaError> {
        Self::new(super::x86::register_set()?)
    }

    pub fn register_set(&self) -> &RegisterSet {
        &self.registers
    }
}

impl Deref for RegisterCatalog {
    type Target = RegisterSet;

    fn deref(&self) -> &Self::Target {
        &self.registers
    }
}
