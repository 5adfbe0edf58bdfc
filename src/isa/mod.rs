//! Encoding metadata and register descriptions for the x86 instruction set.
//!
//! [`encoding`] holds the instruction record model consumed and produced by the [`cleanup`]
//! transforms. [`register`] holds the register model, its template builder, and the canonical
//! x86 catalog exposed through [`RegisterCatalog`](register::RegisterCatalog).

pub mod cleanup;
pub mod diagnostic;
pub mod encoding;
pub mod error;
pub mod register;

#[cfg(test)]
mod tests;
