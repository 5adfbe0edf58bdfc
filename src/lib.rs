//! Machine-readable description of the x86 binary encoding.
//!
//! Two halves live under [`isa`]: the encoding normalizer, which completes partially specified
//! instruction records (prefix legality, operand-size overrides, raw-spec repairs), and the
//! register model, which describes aliased registers and their subfields as bit ranges over
//! shared storage.

pub mod isa;

pub use isa::cleanup::{PipelineConfig, TransformRegistry};
pub use isa::encoding::{InstructionRecord, InstructionSet};
pub use isa::error::IsaError;
pub use isa::register::{RegisterCatalog, RegisterSet};
