use workman_core::Span;

use super::*;

#[test]
fn builder_records_in_emission_order() {
    let mut diags = Diagnostics::new();
    diags
        .error(DiagnosticKind::TypeMismatch, "cannot unify Int with Bool", Span::new(4, 9))
        .detail("expected", "Int")
        .detail("actual", "Bool")
        .emit();
    diags
        .warning(DiagnosticKind::MissingExport, "unused export", Span::new(12, 18))
        .emit();

    assert_eq!(diags.len(), 2);
    assert_eq!(diags.error_count(), 1);
    assert!(diags.has_errors());

    let first = diags.iter().next().unwrap();
    assert_eq!(first.reason(), "type_mismatch");
    assert_eq!(first.details[0], ("expected".to_string(), "Int".to_string()));
}

#[test]
fn find_by_kind() {
    let mut diags = Diagnostics::new();
    diags
        .error(DiagnosticKind::NonExhaustiveMatch, "missing constructor None", Span::new(0, 5))
        .emit();

    assert!(diags.find(DiagnosticKind::NonExhaustiveMatch).is_some());
    assert!(diags.find(DiagnosticKind::OccursCheck).is_none());
}

#[test]
fn plain_format_without_source() {
    let mut diags = Diagnostics::new();
    diags
        .error(DiagnosticKind::UnknownIdentifier, "unknown identifier `foo`", Span::new(2, 5))
        .hint("declare it with `let`")
        .emit();

    let out = diags.printer().render();
    assert_eq!(
        out,
        "error at 2..5: unknown identifier `foo` [unknown_identifier] (hint: declare it with `let`)"
    );
}

#[test]
fn snippet_render_underlines_offender() {
    let source = "let x = foo;\n";
    let mut diags = Diagnostics::new();
    diags
        .error(DiagnosticKind::UnknownIdentifier, "unknown identifier `foo`", Span::new(8, 11))
        .emit();

    let out = diags.printer().source(source).path("main.wm").render();
    assert!(out.contains("main.wm"), "missing path in:\n{out}");
    assert!(out.contains("^^^"), "missing caret underline in:\n{out}");
    assert!(out.contains("unknown identifier `foo`"), "missing label in:\n{out}");
}

#[test]
fn extend_preserves_order() {
    let mut a = Diagnostics::new();
    a.error(DiagnosticKind::TypeMismatch, "first", Span::new(0, 1)).emit();
    let mut b = Diagnostics::new();
    b.error(DiagnosticKind::OccursCheck, "second", Span::new(1, 2)).emit();

    a.extend(b);
    let reasons: Vec<_> = a.iter().map(|d| d.reason()).collect();
    assert_eq!(reasons, vec!["type_mismatch", "occurs_check"]);
}
