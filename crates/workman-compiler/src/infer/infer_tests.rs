use indoc::indoc;

use crate::Compilation;

#[test]
fn polymorphic_identity() {
    assert_eq!(
        Compilation::expect_scheme("let id = (x) => { x };", "id"),
        "∀T. T -> T"
    );
}

#[test]
fn literals_have_primitive_types() {
    let source = indoc! {r#"
        let a = 1;
        let b = true;
        let c = 'x';
        let d = "hi";
        let e = ();
    "#};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("a").unwrap(), "Int");
    assert_eq!(compilation.scheme_text("b").unwrap(), "Bool");
    assert_eq!(compilation.scheme_text("c").unwrap(), "Char");
    assert_eq!(compilation.scheme_text("d").unwrap(), "String");
    assert_eq!(compilation.scheme_text("e").unwrap(), "Unit");
}

#[test]
fn application_instantiates_polymorphism() {
    let source = indoc! {"
        let id = (x) => { x };
        let n = id(3);
        let b = id(true);
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("n").unwrap(), "Int");
    assert_eq!(compilation.scheme_text("b").unwrap(), "Bool");
}

#[test]
fn arithmetic_is_monomorphic() {
    assert_eq!(
        Compilation::expect_scheme("let inc = (x) => { x + 1 };", "inc"),
        "Int -> Int"
    );
}

#[test]
fn tuples_and_blocks() {
    let source = "let f = (x) => { let y = x + 1; (x, y) };";
    assert_eq!(Compilation::expect_scheme(source, "f"), "Int -> (Int, Int)");
}

#[test]
fn adt_constructors_get_schemes() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let some = Some(1);
        let none = None;
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("some").unwrap(), "Option<Int>");
    assert_eq!(compilation.scheme_text("none").unwrap(), "∀T. Option<T>");
}

#[test]
fn unwrap_or_scenario() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let unwrapOr = (o, d) => {
            match(o) {
                None => { d },
                Some(x) => { x }
            }
        };
    "};
    assert_eq!(
        Compilation::expect_scheme(source, "unwrapOr"),
        "∀T. Option<T> -> T -> T"
    );
}

#[test]
fn mutual_recursion_scenario() {
    let source = indoc! {"
        let rec isEven = match(n) { 0 => { true }, _ => { isOdd(n - 1) } }
        and isOdd = match(n) { 0 => { false }, _ => { isEven(n - 1) } };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("isEven").unwrap(), "Int -> Bool");
    assert_eq!(compilation.scheme_text("isOdd").unwrap(), "Int -> Bool");
}

#[test]
fn recursive_list_type() {
    let source = indoc! {"
        type List<T> = Nil | Cons<T, List<T>>;
        let rec length = match(xs) {
            Nil => { 0 },
            Cons(_, rest) => { 1 + length(rest) }
        };
    "};
    assert_eq!(
        Compilation::expect_scheme(source, "length"),
        "∀T. List<T> -> Int"
    );
}

#[test]
fn annotation_constrains_binding() {
    let source = "let f: Int -> Int = (x) => { x };";
    assert_eq!(Compilation::expect_scheme(source, "f"), "Int -> Int");
}

#[test]
fn annotated_result_with_row_alias() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
    "};
    assert_eq!(
        Compilation::expect_scheme(source, "parse"),
        "String -> Result<Int, <NotMul>>"
    );
}

#[test]
fn user_operator_takes_target_scheme() {
    let source = indoc! {"
        let combine = (a, b) => { a + b };
        infixl 6 <+> = combine;
        let v = 1 <+> 2;
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("v").unwrap(), "Int");
}

#[test]
fn user_prefix_operator() {
    let source = indoc! {"
        let negFlag = (b) => { !b };
        prefix ~ = negFlag;
        let v = ~true;
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("v").unwrap(), "Bool");
}

#[test]
fn unknown_identifier_aborts() {
    assert!(Compilation::expect_reasons("let x = ghost;").contains(&"unknown_identifier"));
}

#[test]
fn unknown_type_constructor_aborts() {
    assert!(
        Compilation::expect_reasons("let x: Wat = 1;").contains(&"unknown_type_constructor")
    );
}

#[test]
fn unknown_constructor_aborts() {
    assert!(Compilation::expect_reasons("let x = Wat(1);").contains(&"unknown_constructor"));
}

#[test]
fn type_mismatch_on_annotation() {
    assert!(Compilation::expect_reasons("let x: Int = true;").contains(&"type_mismatch"));
}

#[test]
fn occurs_check_fires() {
    // `f(f)` forces T = T -> U.
    assert!(
        Compilation::expect_reasons("let loop = (f) => { f(f) };").contains(&"occurs_check")
    );
}

#[test]
fn duplicate_pattern_variable_rejected() {
    let source = indoc! {"
        let f = (p) => {
            match(p) {
                (x, x) => { x }
            }
        };
    "};
    assert!(Compilation::expect_reasons(source).contains(&"duplicate_pattern_variable"));
}

#[test]
fn constructor_arity_mismatch_in_pattern() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let f = (o) => {
            match(o) {
                Some(a, b) => { a },
                None => { 0 },
                _ => { 1 }
            }
        };
    "};
    assert!(Compilation::expect_reasons(source).contains(&"constructor_arity_mismatch"));
}

#[test]
fn tuple_arity_mismatch_in_pattern() {
    let source = indoc! {"
        let f = (p) => {
            let q = (1, 2);
            match(q) {
                (a, b, c) => { a },
                _ => { 0 }
            }
        };
    "};
    assert!(Compilation::expect_reasons(source).contains(&"tuple_arity_mismatch"));
}

#[test]
fn recursive_binding_must_be_function() {
    assert!(
        Compilation::expect_reasons("let rec x = x + 1;")
            .contains(&"recursive_binding_not_function")
    );
}

#[test]
fn non_exhaustive_match_names_missing_ctor() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let f = (o) => {
            match(o) {
                Some(x) => { x }
            }
        };
    "};
    match Compilation::compile(source) {
        Err(err) => {
            let diag = err
                .diagnostics()
                .find(crate::DiagnosticKind::NonExhaustiveMatch)
                .expect("non-exhaustive diagnostic");
            assert!(diag.message.contains("None"), "message: {}", diag.message);
        }
        Ok(_) => panic!("expected non-exhaustive match to fail"),
    }
}

#[test]
fn bool_match_requires_both_literals() {
    let missing = indoc! {"
        let f = (b) => {
            match(b) {
                true => { 1 }
            }
        };
    "};
    assert!(Compilation::expect_reasons(missing).contains(&"non_exhaustive_match"));

    let total = indoc! {"
        let f = (b) => {
            match(b) {
                true => { 1 },
                false => { 0 }
            }
        };
    "};
    Compilation::expect_valid(total);
}

#[test]
fn all_irrefutable_tuple_pattern_is_exhaustive() {
    let source = indoc! {"
        let swap = (p) => {
            match(p) {
                (a, b) => { (b, a) }
            }
        };
    "};
    assert_eq!(
        Compilation::expect_scheme(source, "swap"),
        "∀T, U. (T, U) -> (U, T)"
    );
}

#[test]
fn first_class_match_binding_is_a_function() {
    let source = indoc! {"
        type Option<T> = None | Some<T>;
        let isSome = match(o) { Some(_) => { true }, None => { false } };
    "};
    assert_eq!(
        Compilation::expect_scheme(source, "isSome"),
        "∀T. Option<T> -> Bool"
    );
}

#[test]
fn hole_annotation_is_recorded_and_solved() {
    let source = "let x: ? = 1 + 2;";
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.inference.holes.len(), 1);
    assert_eq!(compilation.scheme_text("x").unwrap(), "Int");
}

#[test]
fn native_cmp_returns_ordering() {
    let source = "let c = nativeCmpInt(1, 2);";
    assert_eq!(Compilation::expect_scheme(source, "c"), "Ordering");
}

#[test]
fn generalization_never_captures_env_vars() {
    // Inside the lambda, `x` stays monomorphic: using it at two types
    // must fail.
    let source = indoc! {"
        let f = (x) => {
            let g = (y) => { x };
            (g(1), x + 1)
        };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(
        compilation.scheme_text("f").unwrap(),
        "Int -> (Int, Int)"
    );
}

#[test]
fn marks_cover_every_expression() {
    let source = "let f = (x) => { x + 1 };";
    let compilation = Compilation::expect_valid(source);
    assert!(compilation.inference.marks.len() >= 5);
}
