use indexmap::IndexMap;

use super::*;

fn labels(row: &ErrorRow) -> Vec<&str> {
    row.labels().collect()
}

#[test]
fn unify_var_binds() {
    let mut ctx = TypeCtx::new();
    let v = ctx.fresh_var();
    ctx.unify(&v, &Type::Int).unwrap();
    assert_eq!(ctx.resolve(&v), Type::Int);
}

#[test]
fn unify_follows_chains_without_compression() {
    let mut ctx = TypeCtx::new();
    let a = ctx.fresh_var();
    let b = ctx.fresh_var();
    ctx.unify(&a, &b).unwrap();
    ctx.unify(&b, &Type::Bool).unwrap();
    assert_eq!(ctx.resolve(&a), Type::Bool);
}

#[test]
fn occurs_check_rejects_infinite_type() {
    let mut ctx = TypeCtx::new();
    let v = ctx.fresh_var();
    let arrow = Type::fun(v.clone(), Type::Int);
    let err = ctx.unify(&v, &arrow).unwrap_err();
    assert!(matches!(err, UnifyError::Occurs { .. }));
}

#[test]
fn constructor_mismatch() {
    let mut ctx = TypeCtx::new();
    let opt = Type::ctor("Option", vec![Type::Int]);
    let res = Type::result(Type::Int, Type::Row(ErrorRow::default()));
    assert!(matches!(
        ctx.unify(&opt, &res),
        Err(UnifyError::Mismatch { .. })
    ));
}

#[test]
fn tuple_arity_mismatch_is_distinct() {
    let mut ctx = TypeCtx::new();
    let two = Type::Tuple(vec![Type::Int, Type::Int]);
    let three = Type::Tuple(vec![Type::Int, Type::Int, Type::Int]);
    assert!(matches!(
        ctx.unify(&two, &three),
        Err(UnifyError::TupleArity { left: 2, right: 3 })
    ));
}

#[test]
fn functions_unify_componentwise() {
    let mut ctx = TypeCtx::new();
    let v = ctx.fresh_var();
    let f = Type::fun(Type::Int, v.clone());
    let g = Type::fun(Type::Int, Type::Bool);
    ctx.unify(&f, &g).unwrap();
    assert_eq!(ctx.resolve(&v), Type::Bool);
}

#[test]
fn unknown_unifies_with_anything() {
    let mut ctx = TypeCtx::new();
    let hole = Type::Unknown(HoleProvenance::UserHole);
    ctx.unify(&hole, &Type::Int).unwrap();
    ctx.unify(&Type::Bool, &hole).unwrap();
}

#[test]
fn closed_rows_must_match_exactly() {
    let mut ctx = TypeCtx::new();
    let a = Type::Row(ErrorRow::from_labels(["NotMul".to_string()]));
    let b = Type::Row(ErrorRow::from_labels(["NotMul".to_string()]));
    ctx.unify(&a, &b).unwrap();

    let c = Type::Row(ErrorRow::from_labels(["Overflow".to_string()]));
    assert!(ctx.unify(&a, &c).is_err());
}

#[test]
fn open_row_absorbs_missing_labels() {
    let mut ctx = TypeCtx::new();
    let tail = ctx.fresh_var_id();
    let open = ErrorRow {
        cases: IndexMap::from([("NotMul".to_string(), None)]),
        tail: Some(tail),
    };
    let closed = ErrorRow::from_labels(["NotMul".to_string(), "Overflow".to_string()]);

    ctx.unify(&Type::Row(open.clone()), &Type::Row(closed))
        .unwrap();

    let resolved = ctx.subst.apply_row(&open);
    let mut observed = labels(&resolved);
    observed.sort();
    assert_eq!(observed, vec!["NotMul", "Overflow"]);
    assert!(resolved.tail.is_none());
}

#[test]
fn closed_row_rejects_extra_labels() {
    let mut ctx = TypeCtx::new();
    let open_with_extra = ErrorRow {
        cases: IndexMap::from([("Extra".to_string(), None)]),
        tail: Some(ctx.fresh_var_id()),
    };
    let closed = ErrorRow::from_labels(["NotMul".to_string()]);
    assert!(
        ctx.unify(&Type::Row(open_with_extra), &Type::Row(closed))
            .is_err()
    );
}

#[test]
fn two_open_rows_share_a_tail() {
    let mut ctx = TypeCtx::new();
    let t1 = ctx.fresh_var_id();
    let t2 = ctx.fresh_var_id();
    let r1 = ErrorRow {
        cases: IndexMap::from([("A".to_string(), None)]),
        tail: Some(t1),
    };
    let r2 = ErrorRow {
        cases: IndexMap::from([("B".to_string(), None)]),
        tail: Some(t2),
    };

    ctx.unify(&Type::Row(r1.clone()), &Type::Row(r2.clone()))
        .unwrap();

    let resolved1 = ctx.subst.apply_row(&r1);
    let resolved2 = ctx.subst.apply_row(&r2);
    let mut l1 = labels(&resolved1);
    let mut l2 = labels(&resolved2);
    l1.sort();
    l2.sort();
    assert_eq!(l1, vec!["A", "B"]);
    assert_eq!(l2, vec!["A", "B"]);
    assert_eq!(resolved1.tail, resolved2.tail);
}

#[test]
fn row_payloads_unify() {
    let mut ctx = TypeCtx::new();
    let v = ctx.fresh_var();
    let a = ErrorRow {
        cases: IndexMap::from([("Overflow".to_string(), Some(Box::new(v.clone())))]),
        tail: None,
    };
    let b = ErrorRow {
        cases: IndexMap::from([("Overflow".to_string(), Some(Box::new(Type::Int)))]),
        tail: None,
    };
    ctx.unify(&Type::Row(a), &Type::Row(b)).unwrap();
    assert_eq!(ctx.resolve(&v), Type::Int);
}

#[test]
fn substitution_idempotence() {
    let mut ctx = TypeCtx::new();
    let a = ctx.fresh_var();
    let b = ctx.fresh_var();
    let c = ctx.fresh_var();
    ctx.unify(&a, &Type::fun(b.clone(), c.clone())).unwrap();
    ctx.unify(&b, &Type::Int).unwrap();
    ctx.unify(&c, &Type::ctor("Option", vec![Type::Bool])).unwrap();

    for ty in [&a, &b, &c] {
        assert!(substitution_is_idempotent(&ctx.subst, ty));
    }
}

#[test]
fn no_substitution_entry_contains_its_own_var() {
    // Occurs-check safety: exercise several unifications then verify.
    let mut ctx = TypeCtx::new();
    let a = ctx.fresh_var();
    let b = ctx.fresh_var();
    let c = ctx.fresh_var();
    ctx.unify(&a, &Type::fun(b.clone(), b.clone())).unwrap();
    ctx.unify(&b, &c).unwrap();
    ctx.unify(&c, &Type::Int).unwrap();

    for ty in [&a, &b, &c] {
        let resolved = ctx.resolve(ty);
        let mut vars = Vec::new();
        resolved.free_vars(&mut vars);
        assert!(vars.is_empty(), "unresolved vars in {resolved:?}");
    }
}
