//! Core error type for the CHILL toolchain.
//!
//! Language-level problems are `Diagnostic` values; `CoreError` is the
//! outer error wrapper returned by the pipeline entry points.

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Core error type for the chill-core crate.
///
/// High-level tools (CLI, editor workspace) are expected to:
///   - handle I/O and environment errors on their side, and
///   - render `Diagnostic` values for language-level errors.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// One or more language-level diagnostics. Returned by code
    /// generation when any of them is an error.
    #[error("{}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// A bug in the compiler or an unexpected unreachable situation.
    #[error("internal compiler error: {0}")]
    Internal(&'static str),
}

impl CoreError {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> CoreError {
        CoreError::Diagnostics(diagnostics)
    }

    pub fn internal(message: &'static str) -> CoreError {
        CoreError::Internal(message)
    }

    /// The carried diagnostics, if this is a language-level failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CoreError::Diagnostics(diags) => diags,
            CoreError::Internal(_) => &[],
        }
    }
}

fn summarize(diags: &[Diagnostic]) -> String {
    let errors = diags.iter().filter(|d| d.is_error()).count();
    match diags.iter().find(|d| d.is_error()) {
        Some(first) if errors > 1 => format!("{} (and {} more errors)", first.message, errors - 1),
        Some(first) => first.message.clone(),
        None => "diagnostic error (no messages)".to_string(),
    }
}
