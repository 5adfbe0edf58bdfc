use thiserror::Error;

use crate::isa::diagnostic::{DiagnosticPhase, IsaDiagnostic};

/// Represents any failure that can occur while normalizing encoding records or building the
/// register catalog.
#[derive(Debug, Error)]
pub enum IsaError {
    #[error("malformed encoding specification for '{mnemonic}' ('{raw_spec}'): {reason}")]
    MalformedEncoding {
        mnemonic: String,
        raw_spec: String,
        reason: String,
    },
    #[error("instruction '{mnemonic}' ('{raw_spec}') does not have a parsed encoding specification")]
    MissingEncoding { mnemonic: String, raw_spec: String },
    #[error("invalid register template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },
    #[error("{}", render_diagnostics(.phase, .diagnostics))]
    Diagnostics {
        phase: DiagnosticPhase,
        diagnostics: Vec<IsaDiagnostic>,
    },
    #[error("transform '{name}' failed: {source}")]
    Transform {
        name: String,
        #[source]
        source: Box<IsaError>,
    },
    #[error("transform name '{0}' is already used")]
    DuplicateTransform(String),
}

impl IsaError {
    pub(crate) fn malformed(
        mnemonic: impl Into<String>,
        raw_spec: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        IsaError::MalformedEncoding {
            mnemonic: mnemonic.into(),
            raw_spec: raw_spec.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_template(name: impl Into<String>, reason: impl Into<String>) -> Self {
        IsaError::InvalidTemplate {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

fn render_diagnostics(phase: &DiagnosticPhase, diagnostics: &[IsaDiagnostic]) -> String {
    let mut out = format!("{phase:?} produced {} issue(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str("\n  - ");
        out.push_str(&diag.format_human());
    }
    out
}
