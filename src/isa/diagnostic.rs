/// Phase of the pipeline that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticPhase {
    RegisterBuild,
    RegisterValidation,
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Points at the register (and optionally the subfield) a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisterLocation {
    pub group: String,
    pub register: Option<String>,
    pub subfield: Option<String>,
}

impl RegisterLocation {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            register: None,
            subfield: None,
        }
    }

    pub fn register(group: impl Into<String>, register: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            register: Some(register.into()),
            subfield: None,
        }
    }

    pub fn with_subfield(mut self, subfield: impl Into<String>) -> Self {
        self.subfield = Some(subfield.into());
        self
    }
}

/// Structured diagnostic suitable for tooling integration.
#[derive(Debug, Clone)]
pub struct IsaDiagnostic {
    pub phase: DiagnosticPhase,
    pub level: DiagnosticLevel,
    pub code: &'static str,
    pub message: String,
    pub location: Option<RegisterLocation>,
}

impl IsaDiagnostic {
    pub fn new(
        phase: DiagnosticPhase,
        level: DiagnosticLevel,
        code: &'static str,
        message: impl Into<String>,
        location: Option<RegisterLocation>,
    ) -> Self {
        Self {
            phase,
            level,
            code,
            message: message.into(),
            location,
        }
    }

    pub fn format_human(&self) -> String {
        let location = self
            .location
            .as_ref()
            .map(|loc| {
                let mut path = loc.group.clone();
                for part in [&loc.register, &loc.subfield].into_iter().flatten() {
                    path.push_str("::");
                    path.push_str(part);
                }
                path
            })
            .unwrap_or_else(|| "<unknown>".to_string());
        format!(
            "{level:?} {code}: {message} @ {location}",
            level = self.level,
            code = self.code,
            message = self.message,
            location = location
        )
    }
}
