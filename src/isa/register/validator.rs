//! Structural validation for register groups and whole register sets.
//!
//! Errors reject the group or set. Warnings (overlapping subfields) are logged and kept on the
//! [`Validator`] for inspection.

use ahash::AHashSet;
use tracing::warn;

use super::{Register, RegisterGroup, RegisterSet};
use crate::isa::diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic, RegisterLocation};
use crate::isa::error::IsaError;

/// Per-register checks shared by the group builder and [`Validator`]: non-empty names, ordered
/// bit ranges, subfields that fit inside their register, and (as a warning) subfields that do
/// not overlap each other.
pub(crate) fn check_group(group: &RegisterGroup, phase: DiagnosticPhase, out: &mut Vec<IsaDiagnostic>) {
    for register in &group.registers {
        check_register(group, register, phase, out);
    }
}

fn check_register(
    group: &RegisterGroup,
    register: &Register,
    phase: DiagnosticPhase,
    out: &mut Vec<IsaDiagnostic>,
) {
    let location = RegisterLocation::register(&group.name, &register.name);
    if register.name.is_empty() {
        out.push(error(phase, "register.empty-name", "register has no name", location.clone()));
    }
    if !register.position.is_valid() {
        out.push(error(
            phase,
            "register.inverted-range",
            format!(
                "register '{}' has lsb {} above msb {}",
                register.name, register.position.lsb, register.position.msb
            ),
            location.clone(),
        ));
        return;
    }
    let width = register.width();
    for field in &register.subfields {
        let location = location.clone().with_subfield(&field.name);
        if field.name.is_empty() {
            out.push(error(phase, "subfield.empty-name", "subfield has no name", location.clone()));
        }
        if !field.range.is_valid() || field.range.msb >= width {
            out.push(error(
                phase,
                "subfield.out-of-range",
                format!(
                    "subfield '{}' {} does not fit in the {width} bits of '{}'",
                    field.name, field.range, register.name
                ),
                location,
            ));
        }
    }

    let mut ranges: Vec<_> = register
        .subfields
        .iter()
        .filter(|field| field.range.is_valid() && field.range.msb < width)
        .collect();
    ranges.sort_by_key(|field| field.range.lsb);
    for pair in ranges.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first.range.overlaps(&second.range) {
            out.push(IsaDiagnostic::new(
                phase,
                DiagnosticLevel::Warning,
                "subfield.overlap",
                format!(
                    "subfields '{}' {} and '{}' {} of '{}' overlap",
                    first.name, first.range, second.name, second.range, register.name
                ),
                Some(location.clone().with_subfield(&second.name)),
            ));
        }
    }
}

/// Splits `diagnostics` into an error carrying all of them if any is an error, or logs the
/// warnings and returns them.
pub(crate) fn into_result(
    phase: DiagnosticPhase,
    diagnostics: Vec<IsaDiagnostic>,
) -> Result<Vec<IsaDiagnostic>, IsaError> {
    if diagnostics.iter().any(|diag| diag.level == DiagnosticLevel::Error) {
        return Err(IsaError::Diagnostics { phase, diagnostics });
    }
    for diag in &diagnostics {
        warn!(code = diag.code, "{}", diag.format_human());
    }
    Ok(diagnostics)
}

fn error(
    phase: DiagnosticPhase,
    code: &'static str,
    message: impl Into<String>,
    location: RegisterLocation,
) -> IsaDiagnostic {
    IsaDiagnostic::new(phase, DiagnosticLevel::Error, code, message, Some(location))
}

/// Checks a complete register set. Beyond the per-register checks, every group must have at
/// least one register starting at bit 0, its registers must form one overlapping cluster, and
/// register names must be unique across the set.
pub struct Validator {
    seen_registers: AHashSet<String>,
    diagnostics: Vec<IsaDiagnostic>,
    warnings: Vec<IsaDiagnostic>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self {
            seen_registers: AHashSet::new(),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validates `set` on its own; nothing carries over from earlier calls.
    pub fn validate(&mut self, set: &RegisterSet) -> Result<(), IsaError> {
        self.seen_registers.clear();
        self.diagnostics.clear();
        self.warnings.clear();
        for group in &set.groups {
            self.validate_group(group);
        }
        self.warnings = into_result(DiagnosticPhase::RegisterValidation, std::mem::take(&mut self.diagnostics))?;
        Ok(())
    }

    /// Warnings of the last successful [`Validator::validate`] call.
    pub fn warnings(&self) -> &[IsaDiagnostic] {
        &self.warnings
    }

    fn validate_group(&mut self, group: &RegisterGroup) {
        let phase = DiagnosticPhase::RegisterValidation;
        if group.name.is_empty() {
            self.push("group.empty-name", "register group has no name", RegisterLocation::group(""));
        }
        if group.registers.is_empty() {
            self.push(
                "group.empty",
                format!("group '{}' has no registers", group.name),
                RegisterLocation::group(&group.name),
            );
            return;
        }
        check_group(group, phase, &mut self.diagnostics);

        for register in &group.registers {
            if !self.seen_registers.insert(register.name.clone()) {
                self.push(
                    "register.duplicate",
                    format!("register '{}' is defined more than once", register.name),
                    RegisterLocation::register(&group.name, &register.name),
                );
            }
        }

        let mut ranges: Vec<_> = group
            .registers
            .iter()
            .map(|reg| reg.position)
            .filter(|range| range.is_valid())
            .collect();
        ranges.sort_by_key(|range| range.lsb);
        if ranges.first().is_some_and(|range| range.lsb != 0) {
            self.push(
                "group.no-base-register",
                format!("no register of group '{}' starts at bit 0", group.name),
                RegisterLocation::group(&group.name),
            );
            return;
        }
        let mut max_bit = 0;
        for range in ranges {
            if range.lsb > max_bit {
                self.push(
                    "group.disjoint",
                    format!(
                        "registers of group '{}' split into non-overlapping parts at bit {}",
                        group.name, range.lsb
                    ),
                    RegisterLocation::group(&group.name),
                );
                break;
            }
            max_bit = max_bit.max(range.msb);
        }
    }

    fn push(&mut self, code: &'static str, message: impl Into<String>, location: RegisterLocation) {
        self.diagnostics.push(error(
            DiagnosticPhase::RegisterValidation,
            code,
            message,
            location,
        ));
    }
}

/// Runs a fresh [`Validator`] over `set`.
pub fn validate_register_set(set: &RegisterSet) -> Result<(), IsaError> {
    Validator::new().validate(set)
}
