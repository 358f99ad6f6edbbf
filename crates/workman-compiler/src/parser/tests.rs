use indoc::indoc;

use super::ast::*;
use super::parse;

fn parse_ok(source: &str) -> Program {
    let (program, diagnostics) = parse(source);
    assert!(
        !diagnostics.has_errors(),
        "unexpected parse errors:\n{}",
        diagnostics.printer().source(source).render()
    );
    program
}

fn parse_reasons(source: &str) -> Vec<&'static str> {
    let (_, diagnostics) = parse(source);
    diagnostics.iter().map(|d| d.reason()).collect()
}

fn only_let(program: &Program) -> &LetDecl {
    match &program.items[0] {
        Item::Let(decl) => decl,
        other => panic!("expected let declaration, got {other:?}"),
    }
}

#[test]
fn simple_let_binding() {
    let program = parse_ok("let x = 1;");
    let decl = only_let(&program);
    assert!(!decl.exported);
    assert!(!decl.recursive);
    assert_eq!(decl.bindings[0].name.name, "x");
    assert!(matches!(decl.bindings[0].value.kind, ExprKind::Int(1)));
}

#[test]
fn exported_annotated_binding() {
    let program = parse_ok("export let n: Int = 42;");
    let decl = only_let(&program);
    assert!(decl.exported);
    let annotation = decl.bindings[0].annotation.as_ref().unwrap();
    assert!(
        matches!(&annotation.kind, TypeExprKind::Name { name, args } if name == "Int" && args.is_empty())
    );
}

#[test]
fn arrow_with_block_body() {
    let program = parse_ok("let id = (x) => { x };");
    let decl = only_let(&program);
    let ExprKind::Arrow { params, body } = &decl.bindings[0].value.kind else {
        panic!("expected arrow");
    };
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name.name, "x");
    let ExprKind::Block(block) = &body.kind else {
        panic!("expected block body");
    };
    assert!(block.stmts.is_empty());
    assert!(matches!(
        block.result.as_ref().unwrap().kind,
        ExprKind::Var(ref n) if n == "x"
    ));
}

#[test]
fn operator_precedence_and_associativity() {
    let program = parse_ok("let y = 1 + 2 * 3;");
    let decl = only_let(&program);
    let ExprKind::Binary { op, rhs, .. } = &decl.bindings[0].value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(op, "+");
    assert!(matches!(&rhs.kind, ExprKind::Binary { op, .. } if op == "*"));

    // Left associativity: (10 - 2) - 3.
    let program = parse_ok("let z = 10 - 2 - 3;");
    let decl = only_let(&program);
    let ExprKind::Binary { op, lhs, .. } = &decl.bindings[0].value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(op, "-");
    assert!(matches!(&lhs.kind, ExprKind::Binary { op, .. } if op == "-"));
}

#[test]
fn comparison_and_boolean_operators() {
    let program = parse_ok("let p = 1 < 2 && 3 > 2;");
    let decl = only_let(&program);
    let ExprKind::Binary { op, lhs, rhs, .. } = &decl.bindings[0].value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(op, "&&");
    assert!(matches!(&lhs.kind, ExprKind::Binary { op, .. } if op == "<"));
    assert!(matches!(&rhs.kind, ExprKind::Binary { op, .. } if op == ">"));
}

#[test]
fn declared_operator_extends_table() {
    let program = parse_ok(indoc! {"
        infixl 6 <+> = combine;
        let v = a <+> b <+> c;
    "});
    assert!(matches!(&program.items[0], Item::Infix(decl) if decl.op == "<+>"));
    let Item::Let(decl) = &program.items[1] else {
        panic!("expected let");
    };
    let ExprKind::Binary { op, lhs, .. } = &decl.bindings[0].value.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(op, "<+>");
    assert!(matches!(&lhs.kind, ExprKind::Binary { .. }));
}

#[test]
fn unknown_operator_is_rejected() {
    assert!(parse_reasons("let v = a <*> b;").contains(&"unknown_operator"));
}

#[test]
fn reserved_operator_cannot_be_declared() {
    assert!(parse_reasons("infix 4 = = eq;").contains(&"unknown_operator"));
}

#[test]
fn prefix_operator() {
    let program = parse_ok(indoc! {"
        prefix ~ = bitnot;
        let v = ~x;
    "});
    let Item::Let(decl) = &program.items[1] else {
        panic!("expected let");
    };
    assert!(matches!(
        &decl.bindings[0].value.kind,
        ExprKind::Unary { op, .. } if op == "~"
    ));
}

#[test]
fn default_bang_is_prefix() {
    let program = parse_ok("let v = !flag;");
    let decl = only_let(&program);
    assert!(matches!(
        &decl.bindings[0].value.kind,
        ExprKind::Unary { op, .. } if op == "!"
    ));
}

#[test]
fn call_and_field_postfix() {
    let program = parse_ok("let v = ns.helper(1, 2);");
    let decl = only_let(&program);
    let ExprKind::Call { callee, args } = &decl.bindings[0].value.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 2);
    let ExprKind::Field { base, field } = &callee.kind else {
        panic!("expected field access");
    };
    assert_eq!(field.name, "helper");
    assert!(matches!(&base.kind, ExprKind::Var(n) if n == "ns"));
}

#[test]
fn tuple_and_grouping() {
    let program = parse_ok("let t = (1, 2, 3); let g = (1 + 2) * 3;");
    let Item::Let(tuple_decl) = &program.items[0] else {
        panic!()
    };
    assert!(matches!(
        &tuple_decl.bindings[0].value.kind,
        ExprKind::Tuple(elems) if elems.len() == 3
    ));
    let Item::Let(group_decl) = &program.items[1] else {
        panic!()
    };
    assert!(matches!(
        &group_decl.bindings[0].value.kind,
        ExprKind::Binary { op, .. } if op == "*"
    ));
}

#[test]
fn unit_literal() {
    let program = parse_ok("let u = ();");
    let decl = only_let(&program);
    assert!(matches!(decl.bindings[0].value.kind, ExprKind::Unit));
}

#[test]
fn block_with_statements() {
    let program = parse_ok("let v = { let n = f(s); print(n); n + 1 };");
    let decl = only_let(&program);
    let ExprKind::Block(block) = &decl.bindings[0].value.kind else {
        panic!("expected block");
    };
    assert_eq!(block.stmts.len(), 2);
    assert!(matches!(block.stmts[0], Stmt::Let(_)));
    assert!(matches!(block.stmts[1], Stmt::Expr(_)));
    assert!(block.result.is_some());
}

#[test]
fn match_expression_with_patterns() {
    let program = parse_ok(indoc! {"
        let f = (o) => {
            match(o) {
                None => { 0 },
                Some(x) => { x },
                _ => { 1 }
            }
        };
    "});
    let decl = only_let(&program);
    let ExprKind::Arrow { body, .. } = &decl.bindings[0].value.kind else {
        panic!("expected arrow");
    };
    let ExprKind::Block(block) = &body.kind else {
        panic!("expected block");
    };
    let ExprKind::Match { arms, .. } = &block.result.as_ref().unwrap().kind else {
        panic!("expected match");
    };
    assert_eq!(arms.len(), 3);
    assert!(matches!(&arms[0].pattern.kind, PatKind::Ctor { name, args } if name == "None" && args.is_empty()));
    assert!(matches!(&arms[1].pattern.kind, PatKind::Ctor { name, args } if name == "Some" && args.len() == 1));
    assert!(matches!(arms[2].pattern.kind, PatKind::Wildcard));
}

#[test]
fn match_arm_body_must_be_block() {
    assert!(parse_reasons("let f = (x) => { match(x) { 0 => 1 } };").contains(&"match_arm_not_block"));
}

#[test]
fn first_class_match_desugars_to_arrow() {
    let program = parse_ok("let f = match(x) { 0 => { true }, _ => { false } };");
    let decl = only_let(&program);
    let ExprKind::Arrow { params, body } = &decl.bindings[0].value.kind else {
        panic!("expected desugared arrow, got {:?}", decl.bindings[0].value.kind);
    };
    assert_eq!(params[0].name.name, "x");
    let ExprKind::Block(block) = &body.kind else {
        panic!("expected block");
    };
    let ExprKind::Match { scrutinee, .. } = &block.result.as_ref().unwrap().kind else {
        panic!("expected match");
    };
    assert!(matches!(&scrutinee.kind, ExprKind::Var(n) if n == "x"));
}

#[test]
fn first_class_match_requires_bare_identifier() {
    assert!(
        parse_reasons("let f = match(g(x)) { _ => { 0 } };")
            .contains(&"first_class_match_scrutinee")
    );
}

#[test]
fn recursive_and_chain() {
    let program = parse_ok(indoc! {"
        let rec isEven = match(n) { 0 => { true }, _ => { isOdd(n - 1) } }
        and isOdd = match(n) { 0 => { false }, _ => { isEven(n - 1) } };
    "});
    let decl = only_let(&program);
    assert!(decl.recursive);
    assert_eq!(decl.bindings.len(), 2);
    assert_eq!(decl.bindings[0].name.name, "isEven");
    assert_eq!(decl.bindings[1].name.name, "isOdd");
    // Both desugared to single-parameter arrows.
    for binding in &decl.bindings {
        assert!(matches!(&binding.value.kind, ExprKind::Arrow { params, .. } if params.len() == 1));
    }
}

#[test]
fn type_declaration_with_parameters() {
    let program = parse_ok("type Option<T> = None | Some<T>;");
    let Item::Type(decl) = &program.items[0] else {
        panic!("expected type declaration");
    };
    assert_eq!(decl.name.name, "Option");
    assert_eq!(decl.params[0].name, "T");
    let TypeRhs::Constructors(members) = &decl.rhs else {
        panic!("expected constructors");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name.name, "None");
    assert_eq!(members[0].fields.len(), 0);
    assert_eq!(members[1].name.name, "Some");
    assert_eq!(members[1].fields.len(), 1);
}

#[test]
fn recursive_type_with_nested_generics() {
    let program = parse_ok("type List<T> = Nil | Cons<T, List<T>>;");
    let Item::Type(decl) = &program.items[0] else {
        panic!("expected type declaration");
    };
    let TypeRhs::Constructors(members) = &decl.rhs else {
        panic!("expected constructors");
    };
    let cons = &members[1];
    assert_eq!(cons.fields.len(), 2);
    assert!(matches!(
        &cons.fields[1].kind,
        TypeExprKind::Name { name, args } if name == "List" && args.len() == 1
    ));
}

#[test]
fn leading_pipe_is_allowed() {
    let program = parse_ok("type Bit = | Zero | One;");
    let Item::Type(decl) = &program.items[0] else {
        panic!()
    };
    let TypeRhs::Constructors(members) = &decl.rhs else {
        panic!()
    };
    assert_eq!(members.len(), 2);
}

#[test]
fn error_row_alias() {
    let program = parse_ok("type Err = <NotMul, Overflow<Int>>;");
    let Item::Type(decl) = &program.items[0] else {
        panic!()
    };
    let TypeRhs::ErrorRow(row) = &decl.rhs else {
        panic!("expected error row");
    };
    let TypeExprKind::Row(cases) = &row.kind else {
        panic!("expected row literal");
    };
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].name.name, "NotMul");
    assert!(cases[0].payload.is_none());
    assert!(cases[1].payload.is_some());
}

#[test]
fn function_type_annotation_is_right_associative() {
    let program = parse_ok("let f: Int -> Int -> Bool = g;");
    let decl = only_let(&program);
    let annotation = decl.bindings[0].annotation.as_ref().unwrap();
    let TypeExprKind::Fun { to, .. } = &annotation.kind else {
        panic!("expected function type");
    };
    assert!(matches!(to.kind, TypeExprKind::Fun { .. }));
}

#[test]
fn result_annotation_with_row() {
    let program = parse_ok("let parse: String -> Result<Int, <NotMul>> = p;");
    let decl = only_let(&program);
    let annotation = decl.bindings[0].annotation.as_ref().unwrap();
    let TypeExprKind::Fun { to, .. } = &annotation.kind else {
        panic!("expected function type");
    };
    let TypeExprKind::Name { name, args } = &to.kind else {
        panic!("expected Result type");
    };
    assert_eq!(name, "Result");
    assert_eq!(args.len(), 2);
    assert!(matches!(&args[1].kind, TypeExprKind::Row(cases) if cases.len() == 1));
}

#[test]
fn hole_annotation() {
    let program = parse_ok("let x: ? = f();");
    let decl = only_let(&program);
    assert!(matches!(
        decl.bindings[0].annotation.as_ref().unwrap().kind,
        TypeExprKind::Hole
    ));
}

#[test]
fn named_imports() {
    let program = parse_ok(r#"from "./lib" import { parse, render as show };"#);
    let Item::Import(decl) = &program.items[0] else {
        panic!("expected import");
    };
    assert_eq!(decl.path, "./lib");
    let ImportNames::Named(specs) = &decl.names else {
        panic!("expected named imports");
    };
    assert_eq!(specs[0].local_name(), "parse");
    assert_eq!(specs[1].name.name, "render");
    assert_eq!(specs[1].local_name(), "show");
}

#[test]
fn namespace_import() {
    let program = parse_ok(r#"from "std/list" import * as list;"#);
    let Item::Import(decl) = &program.items[0] else {
        panic!()
    };
    assert!(matches!(&decl.names, ImportNames::Namespace(ns) if ns.name == "list"));
}

#[test]
fn duplicate_import_local_is_rejected() {
    assert!(
        parse_reasons(r#"from "./lib" import { parse, parse };"#).contains(&"duplicate_specifier")
    );
    assert!(
        parse_reasons(r#"from "./lib" import { a as x, b as x };"#)
            .contains(&"duplicate_specifier")
    );
}

#[test]
fn reexport_with_constructors() {
    let program = parse_ok(r#"export from "./shapes" type Shape, Color(..);"#);
    let Item::ReExport(decl) = &program.items[0] else {
        panic!("expected re-export");
    };
    assert_eq!(decl.items.len(), 2);
    assert!(!decl.items[0].with_constructors);
    assert!(decl.items[1].with_constructors);
}

#[test]
fn missing_semicolon_has_hint() {
    let (_, diagnostics) = parse("let x = 1");
    let diag = diagnostics.iter().next().unwrap();
    assert_eq!(diag.reason(), "missing_semicolon");
    assert!(diag.hint.as_deref().unwrap().contains("semicolon"));
}

#[test]
fn node_ids_are_unique() {
    let program = parse_ok("let f = (x) => { x + 1 };");
    let mut ids = Vec::new();
    collect_expr_ids(&only_let(&program).bindings[0].value, &mut ids);
    let mut deduped = ids.clone();
    deduped.sort_by_key(|id| id.as_u32());
    deduped.dedup();
    assert_eq!(ids.len(), deduped.len(), "duplicate node ids: {ids:?}");
}

fn collect_expr_ids(expr: &Expr, out: &mut Vec<workman_core::NodeId>) {
    out.push(expr.id);
    match &expr.kind {
        ExprKind::Tuple(elems) => elems.iter().for_each(|e| collect_expr_ids(e, out)),
        ExprKind::Call { callee, args } => {
            collect_expr_ids(callee, out);
            args.iter().for_each(|e| collect_expr_ids(e, out));
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_expr_ids(lhs, out);
            collect_expr_ids(rhs, out);
        }
        ExprKind::Unary { operand, .. } => collect_expr_ids(operand, out),
        ExprKind::Arrow { body, .. } => collect_expr_ids(body, out),
        ExprKind::Block(block) => {
            for stmt in &block.stmts {
                if let Stmt::Expr(e) = stmt {
                    collect_expr_ids(e, out);
                }
            }
            if let Some(result) = &block.result {
                collect_expr_ids(result, out);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            collect_expr_ids(scrutinee, out);
            arms.iter().for_each(|a| collect_expr_ids(&a.body, out));
        }
        ExprKind::Field { base, .. } => collect_expr_ids(base, out),
        _ => {}
    }
}
