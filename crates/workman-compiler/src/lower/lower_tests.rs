use indoc::indoc;
use workman_ir::PrimOp;
use workman_ir::core::{CoreExpr, CoreExprKind, CoreLit, CorePatKind, CoreProgram};

use crate::Compilation;

fn lower(source: &str) -> CoreProgram {
    let compilation = Compilation::expect_valid(source);
    compilation.core.expect("core lowered")
}

fn binding<'a>(core: &'a CoreProgram, name: &str) -> &'a CoreExpr {
    &core
        .bindings
        .iter()
        .find(|b| b.name == name)
        .unwrap_or_else(|| panic!("no binding `{name}`"))
        .expr
}

#[test]
fn arithmetic_becomes_prims() {
    let core = lower("let f = (x) => { x + 1 * 2 };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "f").kind else {
        panic!("expected lambda");
    };
    let CoreExprKind::Prim { op, args } = &body.kind else {
        panic!("expected prim, got {:?}", body.kind);
    };
    assert_eq!(*op, PrimOp::Add);
    assert!(matches!(
        &args[1].kind,
        CoreExprKind::Prim { op: PrimOp::Mul, .. }
    ));
}

#[test]
fn comparison_and_boolean_prims() {
    let core = lower("let f = (a, b) => { a < b && a >= 0 };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "f").kind else {
        panic!("expected lambda");
    };
    let CoreExprKind::Prim { op, args } = &body.kind else {
        panic!("expected prim");
    };
    assert_eq!(*op, PrimOp::And);
    assert!(matches!(&args[0].kind, CoreExprKind::Prim { op: PrimOp::Lt, .. }));
    assert!(matches!(&args[1].kind, CoreExprKind::Prim { op: PrimOp::Ge, .. }));
}

#[test]
fn equality_selects_primitive_by_type() {
    let core = lower("let f = (a, b) => { a == b + 0 };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "f").kind else {
        panic!("expected lambda");
    };
    assert!(matches!(&body.kind, CoreExprKind::Prim { op: PrimOp::EqInt, .. }));

    let core = lower("let g = (c) => { c == 'x' };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "g").kind else {
        panic!("expected lambda");
    };
    assert!(matches!(&body.kind, CoreExprKind::Prim { op: PrimOp::CharEq, .. }));
}

#[test]
fn char_inequality_negates_char_eq() {
    let core = lower("let g = (c) => { c != 'x' };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "g").kind else {
        panic!("expected lambda");
    };
    let CoreExprKind::Prim { op, args } = &body.kind else {
        panic!("expected prim");
    };
    assert_eq!(*op, PrimOp::Not);
    assert!(matches!(&args[0].kind, CoreExprKind::Prim { op: PrimOp::CharEq, .. }));
}

#[test]
fn user_operator_becomes_op_call_with_alias_binding() {
    let core = lower(indoc! {"
        let combine = (a, b) => { a + b };
        infixl 6 <+> = combine;
        let v = 1 <+> 2;
    "});

    // The alias binding `__op_<+> = combine` exists.
    let alias = binding(&core, "__op_<+>");
    assert!(matches!(&alias.kind, CoreExprKind::Var(name) if name == "combine"));

    // And the use site calls it.
    let CoreExprKind::App { callee, args } = &binding(&core, "v").kind else {
        panic!("expected app");
    };
    assert!(matches!(&callee.kind, CoreExprKind::Var(name) if name == "__op_<+>"));
    assert_eq!(args.len(), 2);
}

#[test]
fn blocks_become_right_nested_lets() {
    let core = lower("let f = (x) => { let y = x + 1; print(y); y };");
    let CoreExprKind::Lam { body, .. } = &binding(&core, "f").kind else {
        panic!("expected lambda");
    };
    // let y = ... in (let _ = print(y) in y)
    let CoreExprKind::Let { name, body: inner, .. } = &body.kind else {
        panic!("expected let, got {:?}", body.kind);
    };
    assert_eq!(name, "y");
    let CoreExprKind::Let { name: discard, rhs, body: tail } = &inner.kind else {
        panic!("expected inner let");
    };
    assert_eq!(discard, "_");
    assert!(matches!(&rhs.kind, CoreExprKind::App { .. }));
    assert!(matches!(&tail.kind, CoreExprKind::Var(name) if name == "y"));
}

#[test]
fn saturated_constructor_application() {
    let core = lower(indoc! {"
        type Option<T> = None | Some<T>;
        let s = Some(1);
        let n = None;
    "});
    let CoreExprKind::Ctor { type_name, ctor, fields } = &binding(&core, "s").kind else {
        panic!("expected ctor");
    };
    assert_eq!(type_name, "Option");
    assert_eq!(ctor, "Some");
    assert_eq!(fields.len(), 1);

    let CoreExprKind::Ctor { ctor, fields, .. } = &binding(&core, "n").kind else {
        panic!("expected ctor");
    };
    assert_eq!(ctor, "None");
    assert!(fields.is_empty());
}

#[test]
fn bare_constructor_eta_expands() {
    let core = lower(indoc! {"
        type Option<T> = None | Some<T>;
        let mk = Some;
    "});
    let CoreExprKind::Lam { params, body } = &binding(&core, "mk").kind else {
        panic!("expected eta-expanded lambda");
    };
    assert_eq!(params.len(), 1);
    assert!(matches!(&body.kind, CoreExprKind::Ctor { ctor, .. } if ctor == "Some"));
}

#[test]
fn match_lowering_keeps_patterns() {
    let core = lower(indoc! {"
        type Option<T> = None | Some<T>;
        let unwrapOr = (o, d) => {
            match(o) {
                None => { d },
                Some(x) => { x }
            }
        };
    "});
    let CoreExprKind::Lam { body, .. } = &binding(&core, "unwrapOr").kind else {
        panic!("expected lambda");
    };
    let CoreExprKind::Match { arms, .. } = &body.kind else {
        panic!("expected match, got {:?}", body.kind);
    };
    assert_eq!(arms.len(), 2);
    assert!(matches!(
        &arms[0].pattern.kind,
        CorePatKind::Ctor { ctor, .. } if ctor == "None"
    ));
    assert!(matches!(
        &arms[1].pattern.kind,
        CorePatKind::Ctor { ctor, args, .. } if ctor == "Some" && args.len() == 1
    ));
}

#[test]
fn recursive_groups_share_ids() {
    let core = lower(indoc! {"
        let rec isEven = match(n) { 0 => { true }, _ => { isOdd(n - 1) } }
        and isOdd = match(n) { 0 => { false }, _ => { isEven(n - 1) } };
        let rec count = match(n) { 0 => { 0 }, _ => { count(n - 1) } };
    "});
    let even = core.bindings.iter().find(|b| b.name == "isEven").unwrap();
    let odd = core.bindings.iter().find(|b| b.name == "isOdd").unwrap();
    let count = core.bindings.iter().find(|b| b.name == "count").unwrap();

    assert!(even.recursive && odd.recursive && count.recursive);
    assert_eq!(even.rec_group, odd.rec_group);
    assert!(even.rec_group.is_some());
    assert_ne!(even.rec_group, count.rec_group);
}

#[test]
fn zero_arg_calls_pass_unit() {
    let core = lower(indoc! {"
        let thunk = () => { 42 };
        let v = thunk();
    "});
    let CoreExprKind::Lam { params, .. } = &binding(&core, "thunk").kind else {
        panic!("expected lambda");
    };
    assert_eq!(params, &vec!["_".to_string()]);

    let CoreExprKind::App { args, .. } = &binding(&core, "v").kind else {
        panic!("expected app");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(args[0].kind, CoreExprKind::Lit(CoreLit::Unit)));
}

#[test]
fn types_carry_constructor_arity_for_tags() {
    let core = lower("type List<T> = Nil | Cons<T, List<T>>;");
    let list = core.types.iter().find(|t| t.name == "List").unwrap();
    assert_eq!(list.constructors[0].name, "Nil");
    assert_eq!(list.constructors[0].arity, 0);
    assert_eq!(list.constructors[1].name, "Cons");
    assert_eq!(list.constructors[1].arity, 2);
}

#[test]
fn exports_survive_lowering() {
    let core = lower("export let api = 1; let internal = 2;");
    assert_eq!(core.exports, vec!["api"]);
}
