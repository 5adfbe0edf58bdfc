//! Instruction set cleanup pipeline.
//!
//! Every cleanup step is a named [`Transform`] over an [`InstructionSet`]. Transforms are
//! collected in a [`TransformRegistry`] with an optional rank; the default pipeline runs all
//! ranked transforms in ascending rank order (registration order breaks ties). The runner logs
//! each step through `tracing` and, when [`LogOptions::TRANSFORM_DIFFS`] is set, a summary of
//! the records each step added or removed.

pub mod operand_size;
pub mod prefix_usage;
pub mod raw_spec;
pub mod sort;

use ahash::AHashMap;
use bitflags::bitflags;
use tracing::{debug, info};

use crate::isa::encoding::{InstructionRecord, InstructionSet};
use crate::isa::error::IsaError;

pub type Transform = fn(&mut InstructionSet) -> Result<(), IsaError>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LogOptions: u8 {
        const TRANSFORM_NAMES = 0b01;
        const TRANSFORM_DIFFS = 0b10;
    }
}

/// Runtime knobs for [`run_pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub log: LogOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log: LogOptions::TRANSFORM_NAMES,
        }
    }
}

impl PipelineConfig {
    pub fn quiet() -> Self {
        Self {
            log: LogOptions::empty(),
        }
    }

    pub fn with_log(mut self, log: LogOptions) -> Self {
        self.log = log;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegisteredTransform {
    pub name: &'static str,
    /// `None` keeps the transform out of the default pipeline; it stays reachable by name.
    pub rank: Option<u32>,
    pub transform: Transform,
}

#[derive(Debug, Default)]
pub struct TransformRegistry {
    transforms: Vec<RegisteredTransform>,
    index: AHashMap<&'static str, usize>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every x86 cleanup transform at its default rank.
    pub fn x86() -> Result<Self, IsaError> {
        let mut registry = Self::new();
        registry
            .register("fix_encoding_specifications", Some(1000), raw_spec::fix_encoding_specifications)?
            .register("drop_modrm_mod_details", Some(1000), raw_spec::drop_modrm_mod_details)?
            .register("fix_rex_prefix_specification", Some(1000), raw_spec::fix_rex_prefix_specification)?
            .register("normalize_lig_flag", Some(1000), raw_spec::normalize_lig_flag)?
            .register(
                "add_missing_memory_offset_encoding",
                Some(1000),
                raw_spec::add_missing_memory_offset_encoding,
            )?
            .register(
                "add_missing_modrm_and_immediate_specification",
                Some(1000),
                raw_spec::add_missing_modrm_and_immediate_specification,
            )?
            .register(
                "fix_encoding_specification_of_pop_fs_and_gs",
                Some(1000),
                raw_spec::fix_encoding_specification_of_pop_fs_and_gs,
            )?
            .register(
                "fix_encoding_specification_of_push_fs_and_gs",
                Some(1000),
                raw_spec::fix_encoding_specification_of_push_fs_and_gs,
            )?
            .register(
                "fix_and_clean_up_encoding_specifications_of_set_instructions",
                Some(1000),
                raw_spec::fix_and_clean_up_encoding_specifications_of_set_instructions,
            )?
            .register(
                "fix_encoding_specification_of_xbegin",
                Some(1000),
                raw_spec::fix_encoding_specification_of_xbegin,
            )?
            .register(
                "add_rex_w_prefixed_version_of_str",
                Some(1000),
                raw_spec::add_rex_w_prefixed_version_of_str,
            )?
            .register(
                "add_operand_size_override_to_instructions_with_implicit_operands",
                Some(3000),
                operand_size::add_operand_size_override_to_instructions_with_implicit_operands,
            )?
            .register(
                "add_operand_size_override_to_special_case_instructions",
                Some(3000),
                operand_size::add_operand_size_override_to_special_case_instructions,
            )?
            .register(
                "add_operand_size_override_version_for_special_case_instructions",
                Some(3000),
                operand_size::add_operand_size_override_version_for_special_case_instructions,
            )?
            .register(
                "add_operand_size_override_prefix",
                Some(5000),
                operand_size::add_operand_size_override_prefix,
            )?
            .register(
                "add_operand_size_override_prefix_usage",
                Some(5010),
                prefix_usage::add_operand_size_override_prefix_usage,
            )?
            .register("add_rex_w_prefix_usage", Some(5010), prefix_usage::add_rex_w_prefix_usage)?
            .register("sort_by_vendor_syntax", Some(7000), sort::sort_by_vendor_syntax)?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        name: &'static str,
        rank: Option<u32>,
        transform: Transform,
    ) -> Result<&mut Self, IsaError> {
        if self.index.contains_key(name) {
            return Err(IsaError::DuplicateTransform(name.to_string()));
        }
        self.index.insert(name, self.transforms.len());
        self.transforms.push(RegisteredTransform {
            name,
            rank,
            transform,
        });
        Ok(self)
    }

    pub fn by_name(&self, name: &str) -> Option<&RegisteredTransform> {
        self.index.get(name).map(|idx| &self.transforms[*idx])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.transforms.iter().map(|entry| entry.name)
    }

    pub fn default_pipeline(&self) -> Vec<RegisteredTransform> {
        let mut pipeline: Vec<RegisteredTransform> = self
            .transforms
            .iter()
            .filter(|entry| entry.rank.is_some())
            .copied()
            .collect();
        pipeline.sort_by_key(|entry| entry.rank);
        pipeline
    }
}

/// Runs `pipeline` in order and stops at the first failing transform.
pub fn run_pipeline(
    pipeline: &[RegisteredTransform],
    instruction_set: &mut InstructionSet,
    config: &PipelineConfig,
) -> Result<(), IsaError> {
    for entry in pipeline {
        run_single(entry, instruction_set, config)?;
    }
    Ok(())
}

fn run_single(
    entry: &RegisteredTransform,
    instruction_set: &mut InstructionSet,
    config: &PipelineConfig,
) -> Result<(), IsaError> {
    let announce = config
        .log
        .intersects(LogOptions::TRANSFORM_NAMES | LogOptions::TRANSFORM_DIFFS);
    if announce {
        info!(transform = entry.name, "Running");
    }
    let result = if config.log.contains(LogOptions::TRANSFORM_DIFFS) {
        run_transform_with_diff(entry.transform, instruction_set).map(|changes| {
            for change in &changes {
                debug!(transform = entry.name, "{change}");
            }
        })
    } else {
        (entry.transform)(instruction_set)
    };
    if announce {
        if result.is_ok() {
            info!(transform = entry.name, "Success");
        } else {
            info!(transform = entry.name, "Failed");
        }
    }
    result.map_err(|source| IsaError::Transform {
        name: entry.name.to_string(),
        source: Box::new(source),
    })
}

/// One record that a transform removed from or added to the set. A modified record shows up as
/// a removal of its old value plus an addition of the new one; reordering produces no change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    Removed(InstructionRecord),
    Added(InstructionRecord),
}

impl std::fmt::Display for RecordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordChange::Removed(record) => write!(f, "- {} [{}]", record.syntax(), record.raw_spec),
            RecordChange::Added(record) => write!(f, "+ {} [{}]", record.syntax(), record.raw_spec),
        }
    }
}

/// Runs `transform` and reports the records it changed, treating the set as a multiset.
pub fn run_transform_with_diff(
    transform: Transform,
    instruction_set: &mut InstructionSet,
) -> Result<Vec<RecordChange>, IsaError> {
    let before = instruction_set.clone();
    transform(instruction_set)?;

    let mut remaining: AHashMap<&InstructionRecord, usize> = AHashMap::new();
    for record in instruction_set.iter() {
        *remaining.entry(record).or_insert(0) += 1;
    }
    let mut changes = Vec::new();
    for record in before.iter() {
        match remaining.get_mut(record) {
            Some(count) if *count > 0 => *count -= 1,
            _ => changes.push(RecordChange::Removed(record.clone())),
        }
    }
    for record in instruction_set.iter() {
        if let Some(count) = remaining.get_mut(record) {
            if *count > 0 {
                *count -= 1;
                changes.push(RecordChange::Added(record.clone()));
            }
        }
    }
    Ok(changes)
}
