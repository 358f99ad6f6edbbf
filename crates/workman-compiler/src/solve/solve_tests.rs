use indoc::indoc;
use workman_core::NodeId;

use crate::Compilation;
use crate::parser::ast::{Binding, Expr, ExprKind, Item, Stmt};
use crate::solve::stubs::ConstraintLabel;

/// The parse/usage pair of the discharge scenario.
const DISCHARGE: &str = indoc! {"
    type ParseErr = <NotMul>;
    let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
    let usage = (s) => {
        match(parse(s)) {
            Ok(n) => { n + 1 },
            Err(_) => { 0 }
        }
    };
"};

fn binding<'a>(compilation: &'a Compilation, name: &str) -> &'a Binding {
    compilation
        .program
        .items
        .iter()
        .find_map(|item| match item {
            Item::Let(decl) => decl.bindings.iter().find(|b| b.name.name == name),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no binding `{name}`"))
}

/// The match expression inside `usage`'s arrow body.
fn usage_match(compilation: &Compilation) -> (NodeId, NodeId, Vec<NodeId>) {
    let usage = binding(compilation, "usage");
    let ExprKind::Arrow { body, .. } = &usage.value.kind else {
        panic!("usage is an arrow");
    };
    let ExprKind::Block(block) = &body.kind else {
        panic!("arrow body is a block");
    };
    let result: &Expr = block.result.as_ref().unwrap();
    let ExprKind::Match { scrutinee, arms } = &result.kind else {
        panic!("body is a match");
    };
    (
        result.id,
        scrutinee.id,
        arms.iter().map(|a| a.body.id).collect(),
    )
}

#[test]
fn discharge_scenario_has_no_diagnostics() {
    let compilation = Compilation::expect_valid(DISCHARGE);
    assert_eq!(
        compilation.scheme_text("usage").unwrap(),
        "String -> Int"
    );
}

#[test]
fn discharge_records_source_at_call_and_rewrite_at_ok_branch() {
    let compilation = Compilation::expect_valid(DISCHARGE);
    let (match_node, scrutinee_node, arm_bodies) = usage_match(&compilation);

    // Source seeded at the `parse(s)` call node.
    let row = compilation
        .solution
        .error_row(scrutinee_node)
        .expect("error label at the call");
    assert_eq!(row.labels().collect::<Vec<_>>(), vec!["NotMul"]);

    // Discharge locality: the Ok branch is clean, the Err branch
    // retains the labels.
    assert!(compilation.solution.error_row(arm_bodies[0]).is_none());
    assert!(compilation.solution.error_row(arm_bodies[1]).is_some());

    // Nothing escapes to the match node itself.
    assert!(compilation.solution.error_row(match_node).is_none());
}

#[test]
fn discharge_flow_edges_reach_both_branches() {
    let compilation = Compilation::expect_valid(DISCHARGE);
    let (_, scrutinee_node, arm_bodies) = usage_match(&compilation);
    for body in arm_bodies {
        assert!(
            compilation
                .solution
                .flow_edges
                .contains(&(scrutinee_node, body)),
            "missing flow edge into arm body"
        );
    }
}

#[test]
fn missing_discharge_is_infectious() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage = (s) => { let n = parse(s); n + 1 };
    "};
    let reasons = Compilation::expect_reasons(source);
    assert!(
        reasons.contains(&"infectious_call_result_mismatch"),
        "got {reasons:?}"
    );
}

#[test]
fn undischarged_row_at_annotated_boundary() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage: String -> Int = (s) => { parse(s) };
    "};
    let reasons = Compilation::expect_reasons(source);
    assert!(reasons.contains(&"boundary_violation"), "got {reasons:?}");
}

#[test]
fn forwarding_the_carrier_satisfies_the_boundary() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let forward = (s) => { parse(s) };
    "};
    let compilation = Compilation::expect_valid(source);
    assert_eq!(
        compilation.scheme_text("forward").unwrap(),
        "String -> Result<Int, <NotMul>>"
    );
}

#[test]
fn wildcard_err_arm_still_discharges() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let usage = (s) => {
            match(parse(s)) {
                Ok(n) => { n + 1 },
                _ => { 0 }
            }
        };
    "};
    // Wildcard covers Err syntactically, so this is exhaustive and
    // still discharges (the wildcard handles every error case).
    let compilation = Compilation::expect_valid(source);
    assert_eq!(compilation.scheme_text("usage").unwrap(), "String -> Int");
}

#[test]
fn error_row_monotonicity_along_flow_edges() {
    let compilation = Compilation::expect_valid(DISCHARGE);
    // For every flow edge a -> b with a label at `a`, b's row must
    // contain a's labels unless a rewrite removed them at b.
    let (_, scrutinee_node, arm_bodies) = usage_match(&compilation);
    let source_row = compilation.solution.error_row(scrutinee_node).unwrap();
    let err_row = compilation.solution.error_row(arm_bodies[1]).unwrap();
    assert!(err_row.covers(source_row));
}

#[test]
fn alias_shares_labels_between_binder_and_uses() {
    let source = indoc! {"
        type ParseErr = <NotMul>;
        let parse: String -> Result<Int, ParseErr> = (s) => { Ok(0) };
        let keep = (s) => { let r = parse(s); r };
    "};
    let compilation = Compilation::expect_valid(source);
    let keep = binding(&compilation, "keep");
    let ExprKind::Arrow { body, .. } = &keep.value.kind else {
        panic!("keep is an arrow");
    };
    let ExprKind::Block(block) = &body.kind else {
        panic!("block body");
    };
    let Stmt::Let(local) = &block.stmts[0] else {
        panic!("local let");
    };
    let binder_node = local.bindings[0].name.id;
    let use_node = block.result.as_ref().unwrap().id;

    assert!(compilation.solution.error_row(binder_node).is_some());
    assert!(compilation.solution.error_row(use_node).is_some());
}

#[test]
fn mem_labels_conflict_pairwise() {
    let a = ConstraintLabel::Mem("owned".to_string());
    let b = ConstraintLabel::Mem("borrowed".to_string());
    let c = ConstraintLabel::Mem("owned".to_string());
    assert!(a.conflicts_with(&b));
    assert!(!a.conflicts_with(&c));

    // The error domain never conflicts.
    let e1 = ConstraintLabel::Error(crate::types::ErrorRow::from_labels(["A".to_string()]));
    let e2 = ConstraintLabel::Error(crate::types::ErrorRow::from_labels(["B".to_string()]));
    assert!(!e1.conflicts_with(&e2));
}

#[test]
fn error_labels_merge_by_row_union() {
    let e1 = ConstraintLabel::Error(crate::types::ErrorRow::from_labels(["A".to_string()]));
    let e2 = ConstraintLabel::Error(crate::types::ErrorRow::from_labels(["B".to_string()]));
    let ConstraintLabel::Error(merged) = e1.merge(&e2) else {
        panic!("expected error label");
    };
    let mut labels: Vec<_> = merged.labels().collect();
    labels.sort();
    assert_eq!(labels, vec!["A", "B"]);
}

#[test]
fn branch_join_disagreement_is_reported() {
    let source = indoc! {"
        let f = (b) => {
            match(b) {
                true => { 1 },
                false => { false }
            }
        };
    "};
    let reasons = Compilation::expect_reasons(source);
    assert!(reasons.contains(&"branch_join_mismatch"), "got {reasons:?}");
}
