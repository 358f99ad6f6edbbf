use indexmap::IndexMap;

use super::*;

#[test]
fn fun_from_folds_right() {
    let ty = Type::fun_from(vec![Type::Int, Type::Bool], Type::Str);
    // Int -> (Bool -> String)
    let Type::Fun(from, to) = &ty else {
        panic!("expected function type");
    };
    assert_eq!(**from, Type::Int);
    assert!(matches!(**to, Type::Fun(..)));
}

#[test]
fn result_parts() {
    let row = Type::Row(ErrorRow::from_labels(["NotMul".to_string()]));
    let ty = Type::result(Type::Int, row);
    let (ok, err) = ty.result_parts().unwrap();
    assert_eq!(*ok, Type::Int);
    assert!(matches!(err, Type::Row(_)));
    assert!(ty.is_result());
    assert_eq!(ty.result_row().unwrap().labels().collect::<Vec<_>>(), vec!["NotMul"]);
}

#[test]
fn free_vars_in_first_occurrence_order() {
    let a = TypeVarId(0);
    let b = TypeVarId(1);
    let ty = Type::fun(Type::Var(b), Type::Tuple(vec![Type::Var(a), Type::Var(b)]));
    let mut vars = Vec::new();
    ty.free_vars(&mut vars);
    assert_eq!(vars, vec![b, a]);
}

#[test]
fn row_union_keeps_first_payload_and_tail() {
    let mut cases = IndexMap::new();
    cases.insert("A".to_string(), Some(Box::new(Type::Int)));
    let left = ErrorRow { cases, tail: None };

    let mut cases = IndexMap::new();
    cases.insert("A".to_string(), Some(Box::new(Type::Bool)));
    cases.insert("B".to_string(), None);
    let right = ErrorRow {
        cases,
        tail: Some(TypeVarId(7)),
    };

    let merged = left.union(&right);
    assert_eq!(merged.cases["A"], Some(Box::new(Type::Int)));
    assert!(merged.cases.contains_key("B"));
    assert_eq!(merged.tail, Some(TypeVarId(7)));
}

#[test]
fn row_covers() {
    let big = ErrorRow::from_labels(["A".to_string(), "B".to_string()]);
    let small = ErrorRow::from_labels(["A".to_string()]);
    assert!(big.covers(&small));
    assert!(!small.covers(&big));
}

#[test]
fn instantiate_refreshes_quantified_vars_only() {
    let mut ctx = TypeCtx::new();
    let q = ctx.fresh_var_id();
    let free = ctx.fresh_var_id();
    let scheme = Scheme::new(vec![q], Type::fun(Type::Var(q), Type::Var(free)));

    let inst = ctx.instantiate(&scheme);
    let Type::Fun(from, to) = inst else {
        panic!("expected function type");
    };
    assert!(matches!(*from, Type::Var(v) if v != q));
    assert_eq!(*to, Type::Var(free));
}

#[test]
fn generalize_skips_env_vars() {
    let mut ctx = TypeCtx::new();
    let in_env = ctx.fresh_var_id();
    let local = ctx.fresh_var_id();
    let ty = Type::fun(Type::Var(in_env), Type::Var(local));

    let scheme = ctx.generalize(&[in_env], &ty);
    assert_eq!(scheme.vars, vec![local]);
}

#[test]
fn format_assigns_stable_names() {
    let mut ctx = TypeCtx::new();
    let a = ctx.fresh_var();
    let b = ctx.fresh_var();
    let ty = Type::fun(a.clone(), Type::fun(b, a));
    assert_eq!(format_type(&ty), "T -> U -> T");
}

#[test]
fn format_parenthesizes_function_arguments() {
    let ty = Type::fun(Type::fun(Type::Int, Type::Bool), Type::Str);
    assert_eq!(format_type(&ty), "(Int -> Bool) -> String");
}

#[test]
fn format_result_with_row() {
    let mut cases = IndexMap::new();
    cases.insert("NotMul".to_string(), None);
    cases.insert("Overflow".to_string(), Some(Box::new(Type::Int)));
    let ty = Type::result(Type::Int, Type::Row(ErrorRow { cases, tail: None }));
    assert_eq!(format_type(&ty), "Result<Int, <NotMul, Overflow<Int>>>");
}

#[test]
fn format_open_row_shows_tail() {
    let row = ErrorRow {
        cases: IndexMap::from([("NotMul".to_string(), None)]),
        tail: Some(TypeVarId(3)),
    };
    assert_eq!(format_type(&Type::Row(row)), "<NotMul, ..T>");
}

#[test]
fn format_scheme_quantifies() {
    let v = TypeVarId(0);
    let scheme = Scheme::new(vec![v], Type::fun(Type::Var(v), Type::Var(v)));
    assert_eq!(format_scheme(&scheme), "∀T. T -> T");
}
