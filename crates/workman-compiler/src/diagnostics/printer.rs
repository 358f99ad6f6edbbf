//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use workman_core::{SourceMap, Span};

use super::{Diagnostics, Severity};

/// Renders diagnostics against their source text.
///
/// With a source attached, each diagnostic becomes a caret-underlined
/// snippet (the line before, the offending line, the line after, per the
/// renderer's folding). Without one, a plain positional listing is
/// produced. A [`SourceMap`] supersedes a single source for multi-module
/// reports.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    source: Option<&'s str>,
    path: Option<&'s str>,
    sources: Option<&'s SourceMap>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            path: None,
            sources: None,
            colored: false,
        }
    }

    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn sources(mut self, map: &'s SourceMap) -> Self {
        self.sources = Some(map);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        if self.source.is_none() && self.sources.is_none() {
            return self.format_plain(w);
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            let (source, path) = self.locate(diag.source);
            let Some(source) = source else {
                if i > 0 {
                    w.write_char('\n')?;
                }
                writeln!(w, "{diag}")?;
                continue;
            };

            let range = adjust_range(diag.span, source.len());

            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range.clone())
                    .label(&diag.message),
            );

            if let Some(p) = path {
                snippet = snippet.path(p);
            }

            for related in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(adjust_range(related.span, source.len()))
                        .label(&related.message),
                );
            }

            let level = severity_to_level(diag.severity);
            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
            w.write_char('\n')?;
            if let Some(hint) = &diag.hint {
                writeln!(w, "help: {hint}")?;
            }
        }

        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{diag}")?;
        }
        Ok(())
    }

    /// Source text and path for a diagnostic, preferring the source map.
    fn locate(&self, id: Option<workman_core::SourceId>) -> (Option<&'s str>, Option<&'s str>) {
        if let Some(map) = self.sources {
            if let Some(file) = id.and_then(|id| map.try_get(id)) {
                return (Some(file.text.as_str()), Some(file.path.as_str()));
            }
        }
        (self.source, self.path)
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let start = span.start as usize;
    let end = span.end as usize;

    if start == end {
        return start..(start + 1).min(limit);
    }

    start..end.min(limit)
}
