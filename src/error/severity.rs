// src/error/severity.rs
use std::fmt;

/// Distinguishes the non-fatal accumulate-and-continue diagnostics from the
/// fatal ones that abort the lowering pass outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    /// Non-fatal informational diagnostic (e.g. array-initializer truncation).
    Warning = 0,
    /// Pushed to the accumulated error list; lowering continues past it.
    Error = 1,
    /// Aborts the pass: unimplemented-construct (when configured fatal) or
    /// IR-validation failure.
    Fatal = 2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}
