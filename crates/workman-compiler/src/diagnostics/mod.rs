//! Compiler diagnostics: collection and rendering.
//!
//! Every stage reports through a [`Diagnostics`] list. Entries keep
//! their machine-readable [`DiagnosticKind`] (the `reason` identifier of
//! the diagnostic contract) next to the human-readable message, the
//! offending span, and optional freeform detail pairs. Emission order is
//! preserved; it doubles as the report order.

mod kind;
mod printer;

#[cfg(test)]
mod diagnostics_tests;

use workman_core::{SourceId, Span};

pub use kind::DiagnosticKind;
pub use printer::DiagnosticsPrinter;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Related location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
    /// File the span points into, when known. Single-source pipelines
    /// leave this `None` and the printer falls back to its own source.
    pub source: Option<SourceId>,
    /// Freeform key/value details for tooling.
    pub details: Vec<(String, String)>,
    pub hint: Option<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// The short machine-readable reason identifier.
    pub fn reason(&self) -> &'static str {
        self.kind.reason()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}: {} [{}]",
            self.severity,
            self.span,
            self.message,
            self.kind.reason()
        )?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

/// Collection of diagnostics from all stages, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

/// Builder for one diagnostic.
#[must_use = "diagnostic not recorded, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    entry: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
    ) -> DiagnosticBuilder<'_> {
        self.build(Severity::Error, kind, message, span)
    }

    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
    ) -> DiagnosticBuilder<'_> {
        self.build(Severity::Warning, kind, message, span)
    }

    fn build(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            entry: Diagnostic {
                severity,
                kind,
                span,
                message: message.into(),
                source: None,
                details: Vec::new(),
                hint: None,
                related: Vec::new(),
            },
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// First diagnostic with the given kind, if any.
    pub fn find(&self, kind: DiagnosticKind) -> Option<&Diagnostic> {
        self.entries.iter().find(|d| d.kind == kind)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn source(mut self, id: SourceId) -> Self {
        self.entry.source = Some(id);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry.details.push((key.into(), value.into()));
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.entry.hint = Some(hint.into());
        self
    }

    pub fn related_to(mut self, message: impl Into<String>, span: Span) -> Self {
        self.entry.related.push(RelatedInfo {
            span,
            message: message.into(),
        });
        self
    }

    pub fn emit(self) {
        self.diagnostics.entries.push(self.entry);
    }
}
