//! Helpers for constructing instruction records programmatically without routing through the
//! manual extraction step.

use super::{EncodingSpecification, InstructionRecord, Operand};

/// Builder for [`InstructionRecord`]; call [`RecordBuilder::finish`] to obtain the record.
pub struct RecordBuilder {
    record: InstructionRecord,
}

impl RecordBuilder {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            record: InstructionRecord {
                mnemonic: mnemonic.into(),
                available_in_64_bit: true,
                ..InstructionRecord::default()
            },
        }
    }

    /// Appends an operand; operands keep syntax order.
    pub fn operand(mut self, operand: Operand) -> Self {
        self.record.operands.push(operand);
        self
    }

    /// Replaces the operand list.
    pub fn operands<I>(mut self, operands: I) -> Self
    where
        I: IntoIterator<Item = Operand>,
    {
        self.record.operands = operands.into_iter().collect();
        self
    }

    pub fn raw_spec(mut self, raw_spec: impl Into<String>) -> Self {
        self.record.raw_spec = raw_spec.into();
        self
    }

    pub fn structured(mut self, spec: EncodingSpecification) -> Self {
        self.record.structured_spec = Some(spec);
        self
    }

    pub fn available_in_64_bit(mut self, available: bool) -> Self {
        self.record.available_in_64_bit = available;
        self
    }

    pub fn legacy_instruction(mut self, legacy: bool) -> Self {
        self.record.legacy_instruction = legacy;
        self
    }

    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.record.feature_name = Some(feature.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.record.description = Some(description.into());
        self
    }

    pub fn finish(self) -> InstructionRecord {
        self.record
    }
}
