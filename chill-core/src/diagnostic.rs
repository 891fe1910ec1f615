//! Rich diagnostics for the CHILL compiler.
//!
//! Every phase reports problems as `Diagnostic` values collected in a
//! `DiagnosticSink`; nothing is thrown. Code generation refuses to run
//! while the sink holds an error.

use std::fmt;

use crate::span::{LineIndex, Span};

/// Severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    LexicalError,
    SyntaxError,
    DuplicateDeclaration,
    UnresolvedReference,
    CyclicModeDefinition,
    ModeMismatch,
    NonExhaustiveCase,
    UnprovableBound,
}

impl DiagnosticKind {
    /// Default code for the kind. A few warnings use their own codes,
    /// see `codes`.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::LexicalError => "E0001",
            DiagnosticKind::SyntaxError => "E0100",
            DiagnosticKind::DuplicateDeclaration => "E0200",
            DiagnosticKind::UnresolvedReference => "E0201",
            DiagnosticKind::CyclicModeDefinition => "E0300",
            DiagnosticKind::ModeMismatch => "E0301",
            DiagnosticKind::NonExhaustiveCase => "W0400",
            DiagnosticKind::UnprovableBound => "W0401",
        }
    }
}

/// Codes that differ from `DiagnosticKind::code`.
pub mod codes {
    /// SEIZE that no known unit grants.
    pub const UNSATISFIED_SEIZE: &str = "W0201";
    /// Constant outside the bounds of a range mode.
    pub const RANGE_BOUND: &str = "W0302";
    /// Well-moded construct the C back end cannot express.
    pub const UNSUPPORTED: &str = "E0500";
}

/// A labeled span used inside diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: Option<String>,
}

/// A single diagnostic message produced by the compiler.
///
/// A diagnostic has a main message, a primary label indicating the
/// main source location, and zero or more secondary labels for
/// related locations ("first declared here" and the like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub code: &'static str,
    pub message: String,
    pub primary: Label,
    pub secondary: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, kind: DiagnosticKind, message: String, span: Span) -> Diagnostic {
        Diagnostic {
            severity,
            kind,
            code: kind.code(),
            message,
            primary: Label {
                span,
                message: None,
            },
            secondary: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Create a new error diagnostic with a primary span.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(Severity::Error, kind, message.into(), span)
    }

    /// Create a new warning diagnostic with a primary span.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(Severity::Warning, kind, message.into(), span)
    }

    /// Override the code derived from the kind.
    pub fn with_code(mut self, code: &'static str) -> Diagnostic {
        self.code = code;
        self
    }

    /// Add a secondary label with its own span and optional message.
    pub fn with_secondary_label(
        mut self,
        span: Span,
        message: impl Into<Option<String>>,
    ) -> Diagnostic {
        self.secondary.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    /// Attach a free-form note such as a spelling suggestion.
    pub fn with_note(mut self, note: impl Into<String>) -> Diagnostic {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn span(&self) -> Span {
        self.primary.span
    }
}

/// Accumulates the diagnostics of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(code = diagnostic.code, message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.push(d);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Errors first, then warnings; source order within each group.
    pub fn grouped(&self) -> Vec<&Diagnostic> {
        let mut out: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        out.sort_by_key(|d| (d.severity, d.primary.span.start));
        out
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Render a diagnostic as `path:line:col: severity[code]: message`
/// followed by the source line and a caret under the primary span.
/// Lines and columns are 1-based in the rendered text.
pub fn render(diag: &Diagnostic, path: &str, index: &LineIndex) -> String {
    let pos = index.position(diag.primary.span.start);
    let line_text = index.line_text(pos.line);
    let width = index
        .position(diag.primary.span.end)
        .character
        .saturating_sub(pos.character)
        .max(1);
    let mut out = format!(
        "{}:{}:{}: {}[{}]: {}\n  {}\n  {}{}",
        path,
        pos.line + 1,
        pos.character + 1,
        diag.severity,
        diag.code,
        diag.message,
        line_text,
        " ".repeat(pos.character as usize),
        "^".repeat(width as usize),
    );
    for label in &diag.secondary {
        let p = index.position(label.span.start);
        let msg = label.message.as_deref().unwrap_or("related location");
        out.push_str(&format!("\n  note: {}:{}:{}: {}", path, p.line + 1, p.character + 1, msg));
    }
    for note in &diag.notes {
        out.push_str(&format!("\n  help: {note}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn grouped_puts_errors_first() {
        let mut sink = DiagnosticSink::new();
        let f = FileId(0);
        sink.push(Diagnostic::warning(DiagnosticKind::NonExhaustiveCase, "w", Span::new(f, 0, 1)));
        sink.push(Diagnostic::error(DiagnosticKind::SyntaxError, "e", Span::new(f, 5, 6)));
        let grouped = sink.grouped();
        assert_eq!(grouped[0].message, "e");
        assert_eq!(grouped[1].message, "w");
        assert!(sink.has_errors());
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn render_points_at_column() {
        let src = "MODULE m;\n  x := 1;\n";
        let idx = LineIndex::new(src);
        let d = Diagnostic::error(DiagnosticKind::UnresolvedReference, "undeclared `x`", Span::new(FileId(0), 12, 13));
        let text = render(&d, "m.ch", &idx);
        assert!(text.starts_with("m.ch:2:3: error[E0201]: undeclared `x`"), "{text}");
        assert!(text.ends_with("\n    ^"), "{text}");
    }
}
