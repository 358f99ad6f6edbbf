//! End-to-end scenarios over the compilation facade.

use indoc::indoc;

use crate::Compilation;
use crate::compilation::CompilationBuilder;
use crate::foreign::ForeignTypes;
use crate::resolve::MemoryLoader;
use crate::types::{Scheme, Type, substitution_is_idempotent};

// ---- end-to-end scenarios ---------------------------------------------

#[test]
fn polymorphic_identity_end_to_end() {
    assert_eq!(
        Compilation::expect_scheme("let id = (x) => { x };", "id"),
        "∀T. T -> T"
    );
}

#[test]
fn adt_match_compiles_to_tag_dispatch() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let unwrapOr = (o, d) => {
            match(o) {
                None => { d },
                Some(x) => { x }
            }
        };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(
        compilation.scheme_text("unwrapOr").unwrap(),
        "∀T. Option<T> -> T -> T"
    );

    let mir = compilation.mir.as_ref().unwrap();
    let table = mir.tag_table("Option").unwrap();
    assert_eq!(table.tag_of("None"), Some(0));
    assert_eq!(table.tag_of("Some"), Some(1));
}

#[test]
fn mutual_recursion_end_to_end() {
    let source = indoc! {"
        let rec isEven = match(n) { 0 => { true }, _ => { isOdd(n - 1) } }
        and isOdd = match(n) { 0 => { false }, _ => { isEven(n - 1) } };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("isEven").unwrap(), "Int -> Bool");
    assert_eq!(compilation.scheme_text("isOdd").unwrap(), "Int -> Bool");

    let mir = compilation.mir.as_ref().unwrap();
    assert!(mir.function("isEven").unwrap().is_self_recursive);
    assert!(mir.function("isOdd").unwrap().is_self_recursive);
}

#[test]
fn error_infection_is_discharged_by_total_match() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage = (s) => {
            match(parse(s)) {
                Ok(n) => { n + 1 },
                Err(_) => { 0 }
            }
        };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("usage").unwrap(), "String -> Int");
    // The flow graph recorded the source at `parse(s)`.
    assert!(
        compilation
            .view
            .flow
            .labels
            .iter()
            .any(|(_, label)| label.contains("NotMul"))
    );
}

#[test]
fn undischarged_error_is_reported() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage = (s) => { let n = parse(s); n + 1 };
    "};
    let reasons = Compilation::expect_reasons(source);
    assert!(
        reasons.contains(&"infectious_call_result_mismatch")
            || reasons.contains(&"boundary_violation"),
        "got {reasons:?}"
    );
}

#[test]
fn non_exhaustive_match_is_reported() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let f = (o) => {
            match(o) {
                Some(x) => { x }
            }
        };
    "};
    let reasons = Compilation::expect_reasons(source);
    assert!(reasons.contains(&"non_exhaustive_match"), "got {reasons:?}");
}

// ---- universal properties ---------------------------------------------

#[test]
fn final_substitution_is_idempotent() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let unwrapOr = (o, d) => {
            match(o) {
                None => { d },
                Some(x) => { x }
            }
        };
        let used = unwrapOr(Some(3), 0);
    "};
    let compilation = Compilation::expect_valid(source);
    for (_, mark) in compilation.inference.marks.iter() {
        assert!(substitution_is_idempotent(
            &compilation.ctx.subst,
            &mark.ty
        ));
    }
}

#[test]
fn no_resolved_type_contains_bound_vars_cyclically() {
    let source = "let app = (f, x) => { f(x) };";
    let compilation = Compilation::expect_valid(source);
    // Resolving terminates for every mark (occurs-check safety): this
    // would loop forever on a cyclic substitution.
    for (_, mark) in compilation.inference.marks.iter() {
        let _ = compilation.ctx.resolve(&mark.ty);
    }
}

#[test]
fn lexer_round_trip() {
    use crate::lexer::{lex, print_tokens, token_text};
    let source = indoc! {r#"
        type Option<T> = None | Some<T>;
        let unwrapOr = (o, d) => { match(o) { None => { d }, Some(x) => { x } } };
    "#};
    let (tokens, diagnostics) = lex(source);
    assert!(diagnostics.is_empty());
    let printed = print_tokens(source, &tokens);
    let (relexed, rediag) = lex(&printed);
    assert!(rediag.is_empty());
    let original: Vec<_> = tokens
        .iter()
        .map(|t| (t.kind, token_text(source, t).to_string()))
        .collect();
    let round: Vec<_> = relexed
        .iter()
        .map(|t| (t.kind, token_text(&printed, t).to_string()))
        .collect();
    assert_eq!(original, round);
}

// ---- module graphs ----------------------------------------------------

#[test]
fn graph_compilation_in_topological_order() {
    let mut loader = MemoryLoader::new();
    loader.insert("util.wm", "export let double = (x) => { x + x };");
    loader.insert(
        "main.wm",
        indoc! {r#"
            from "./util" import { double };
            let four = double(2);
        "#},
    );

    let project = CompilationBuilder::new()
        .compile_graph("main.wm", &loader)
        .expect("graph compiles");
    assert!(!project.has_errors());

    let paths: Vec<&str> = project.modules.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, vec!["util.wm", "main.wm"]);

    let main = project.module("main.wm").unwrap();
    let scheme = main.inference.bindings.get("four").unwrap();
    assert_eq!(
        crate::types::format_type(&project.ctx.resolve(&scheme.ty)),
        "Int"
    );
}

#[test]
fn imported_types_bring_constructors() {
    let mut loader = MemoryLoader::new();
    loader.insert("opt.wm", "export type Option<T> = None | Some<T>;");
    loader.insert(
        "main.wm",
        indoc! {r#"
            from "./opt" import { Option };
            let s = Some(1);
        "#},
    );

    let project = CompilationBuilder::new()
        .compile_graph("main.wm", &loader)
        .expect("graph compiles");
    assert!(!project.has_errors());

    let main = project.module("main.wm").unwrap();
    let scheme = main.inference.bindings.get("s").unwrap();
    assert_eq!(
        crate::types::format_type(&project.ctx.resolve(&scheme.ty)),
        "Option<Int>"
    );
}

#[test]
fn namespace_import_binds_member_access() {
    let mut loader = MemoryLoader::new();
    loader.insert("math.wm", "export let square = (x) => { x * x };");
    loader.insert(
        "main.wm",
        indoc! {r#"
            from "./math" import * as math;
            let nine = math.square(3);
        "#},
    );

    let project = CompilationBuilder::new()
        .compile_graph("main.wm", &loader)
        .expect("graph compiles");
    assert!(!project.has_errors());

    let main = project.module("main.wm").unwrap();
    let scheme = main.inference.bindings.get("nine").unwrap();
    assert_eq!(
        crate::types::format_type(&project.ctx.resolve(&scheme.ty)),
        "Int"
    );
}

#[test]
fn prelude_exports_are_ambient() {
    let mut loader = MemoryLoader::new();
    loader.insert("prelude.wm", "export let one = 1;");
    loader.insert("main.wm", "let two = one + one;");

    let project = CompilationBuilder::new()
        .prelude("prelude.wm")
        .compile_graph("main.wm", &loader)
        .expect("graph compiles");
    assert!(!project.has_errors());
}

// ---- foreign seeds ----------------------------------------------------

#[test]
fn foreign_values_seed_the_environment() {
    let mut foreign = ForeignTypes::default();
    foreign.values.insert(
        "cAbs".to_string(),
        Scheme::mono(Type::fun(Type::Int, Type::Int)),
    );

    let compilation = CompilationBuilder::new()
        .foreign(foreign)
        .compile_source("let v = cAbs(0 - 5);")
        .expect("compiles with foreign seed");
    assert!(compilation.is_valid());
    assert_eq!(compilation.scheme_text("v").unwrap(), "Int");
}

#[test]
fn foreign_diagnostics_surface() {
    let foreign = ForeignTypes {
        diagnostics: vec!["unsupported header construct".to_string()],
        ..Default::default()
    };
    let compilation = CompilationBuilder::new()
        .foreign(foreign)
        .compile_source("let x = 1;")
        .expect("compiles");
    assert!(
        compilation
            .diagnostics
            .iter()
            .any(|d| d.reason() == "foreign_type_error")
    );
}

// ---- lowering gate ----------------------------------------------------

#[test]
fn solver_errors_skip_lowering_unless_forced() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage = (s) => { let n = parse(s); n + 1 };
    "};
    let plain = Compilation::compile(source).expect("non-fatal");
    assert!(plain.mir.is_none());

    let forced = CompilationBuilder::new()
        .force_lowering()
        .compile_source(source)
        .expect("non-fatal");
    assert!(forced.mir.is_some());
}
