//! Expands compact register templates into fully enumerated register groups.
//!
//! A template describes one width of an aliased register family, e.g. `{"R", "X", 0, 63}` for
//! RAX/RCX/..., and is instantiated either over a list of base names ("A", "C", "D", "B") or over
//! a numeric index range ("MM" + 0..16).

use super::{BitRange, Register, RegisterClass, RegisterGroup, RegisterSet};
use crate::isa::error::IsaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterTemplate<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
    pub position: BitRange,
    /// Added to the binary encoding of the base register, e.g. 4 for AH relative to AL.
    pub encoding_offset: u32,
    pub feature_name: Option<&'a str>,
    pub register_class: RegisterClass,
}

impl<'a> RegisterTemplate<'a> {
    pub const fn new(prefix: &'a str, suffix: &'a str, lsb: u32, msb: u32, register_class: RegisterClass) -> Self {
        Self {
            prefix,
            suffix,
            position: BitRange::new(lsb, msb),
            encoding_offset: 0,
            feature_name: None,
            register_class,
        }
    }

    pub const fn with_encoding_offset(mut self, offset: u32) -> Self {
        self.encoding_offset = offset;
        self
    }

    pub const fn with_feature(mut self, feature: &'a str) -> Self {
        self.feature_name = Some(feature);
        self
    }

    fn pattern(&self) -> String {
        format!("{}<base>{}", self.prefix, self.suffix)
    }

    fn instantiate(&self, base: &str, encoding: u32) -> Register {
        let builder = Register::builder(
            format!("{}{}{}", self.prefix, base, self.suffix),
            self.position.lsb,
            self.position.msb,
        )
        .encoding(encoding + self.encoding_offset)
        .class(self.register_class);
        match self.feature_name {
            Some(feature) => builder.feature(feature).finish(),
            None => builder.finish(),
        }
    }
}

fn check_templates(templates: &[RegisterTemplate<'_>]) -> Result<(), IsaError> {
    if templates.is_empty() {
        return Err(IsaError::invalid_template("<none>", "at least one template is required"));
    }
    for template in templates {
        if !template.position.is_valid() {
            return Err(IsaError::invalid_template(
                template.pattern(),
                format!(
                    "lsb {} is above msb {}",
                    template.position.lsb, template.position.msb
                ),
            ));
        }
    }
    Ok(())
}

fn aliased_group(templates: &[RegisterTemplate<'_>], base: &str, encoding: u32) -> Result<RegisterGroup, IsaError> {
    let registers: Vec<Register> = templates
        .iter()
        .map(|template| template.instantiate(base, encoding))
        .collect();
    let first = registers[0].name.clone();
    registers
        .into_iter()
        .fold(
            RegisterGroup::builder(
                format!("{first} group"),
                format!("The group of registers aliased with {first}"),
            ),
            |group, register| group.register(register),
        )
        .build()
}

/// Builds one group per base name. The register of template `t` for base name number `i` is
/// named `t.prefix + base + t.suffix` and encoded as `base_encoding + i + t.encoding_offset`.
pub fn registers_from_base_names(
    templates: &[RegisterTemplate<'_>],
    base_names: &[&str],
    base_encoding: u32,
) -> Result<RegisterSet, IsaError> {
    check_templates(templates)?;
    base_names
        .iter()
        .zip(base_encoding..)
        .map(|(base, encoding)| aliased_group(templates, base, encoding))
        .collect::<Result<Vec<_>, _>>()
        .map(|groups| groups.into_iter().collect())
}

/// Builds one group per index in `[begin, end)`. Registers are named
/// `t.prefix + base_name + index + t.suffix` and encoded as
/// `base_encoding + (index - begin) + t.encoding_offset`.
pub fn registers_from_base_name_and_indices(
    templates: &[RegisterTemplate<'_>],
    base_name: &str,
    begin: u32,
    end: u32,
    base_encoding: u32,
) -> Result<RegisterSet, IsaError> {
    check_templates(templates)?;
    if begin > end {
        return Err(IsaError::invalid_template(
            base_name,
            format!("index range [{begin}, {end}) is reversed"),
        ));
    }
    (begin..end)
        .map(|index| aliased_group(templates, &format!("{base_name}{index}"), base_encoding + (index - begin)))
        .collect::<Result<Vec<_>, _>>()
        .map(|groups| groups.into_iter().collect())
}
