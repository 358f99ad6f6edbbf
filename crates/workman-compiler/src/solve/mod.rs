//! Constraint solver (Layer 2).
//!
//! Consumes the inferencer's stubs in seven ordered phases: annotations,
//! calls & field access, numeric/boolean operands, branch joins,
//! constraint propagation, conflict detection, and function boundary
//! checks. Single pass throughout: emission order is a topological
//! order for the monotone error domain, so no fixed-point iteration is
//! needed. Non-monotone domains would swap in a worklist behind
//! [`propagate`] without touching the other phases.
//!
//! Solver diagnostics accumulate; they do not abort. A non-empty list
//! makes the pipeline skip lowering unless forced.

pub mod stubs;

#[cfg(test)]
mod solve_tests;

use std::collections::HashMap;

use indexmap::IndexMap;
use workman_core::{NodeId, Span};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::infer::Inference;
use crate::types::{ErrorRow, Type, TypeCtx, TypeNamer, format_type_with};

use stubs::{ConstraintLabel, ConstraintStub, Domain};

/// Per-node constraint labels after propagation, plus the flow edges
/// walked, plus everything the solver had to say.
#[derive(Debug, Default)]
pub struct Solution {
    pub labels: HashMap<NodeId, IndexMap<Domain, ConstraintLabel>>,
    pub flow_edges: Vec<(NodeId, NodeId)>,
    pub diagnostics: Diagnostics,
}

impl Solution {
    /// The pending error row at a node, if any.
    pub fn error_row(&self, node: NodeId) -> Option<&ErrorRow> {
        match self.labels.get(&node)?.get(&Domain::Error)? {
            ConstraintLabel::Error(row) => Some(row),
            _ => None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Run all solver phases over an inference result.
pub fn solve(inference: &Inference, ctx: &mut TypeCtx) -> Solution {
    let mut solver = Solver {
        inference,
        ctx,
        solution: Solution::default(),
    };
    solver.annotations();
    solver.calls_and_fields();
    solver.numeric_boolean();
    solver.branch_joins();
    solver.propagate();
    solver.detect_conflicts();
    solver.boundary_checks();
    solver.solution
}

struct Solver<'a> {
    inference: &'a Inference,
    ctx: &'a mut TypeCtx,
    solution: Solution,
}

impl Solver<'_> {
    fn span_of(&self, node: NodeId) -> Span {
        self.inference.marks.span_of(node).unwrap_or_default()
    }

    /// Phase 1: unify annotation actuals with expecteds.
    ///
    /// Most of these were already unified eagerly during inference and
    /// resolve trivially. The deferred infectious shape (a `Result`
    /// actual against a non-`Result` annotation) is left standing for
    /// the boundary check, which owns that report.
    fn annotations(&mut self) {
        for index in 0..self.inference.stubs.len() {
            let ConstraintStub::Annotation {
                node,
                expected,
                actual,
            } = self.inference.stubs[index].clone()
            else {
                continue;
            };
            if let Err(err) = self.ctx.unify(&expected, &actual) {
                if crate::infer::is_infectious_mismatch(&err) {
                    continue;
                }
                let span = self.span_of(node);
                self.report_mismatch(err, span);
            }
        }
    }

    /// Phase 2: resolve call stubs (argument against parameter) and
    /// field-access stubs against known record types.
    fn calls_and_fields(&mut self) {
        for index in 0..self.inference.stubs.len() {
            match &self.inference.stubs[index].clone() {
                ConstraintStub::Call {
                    argument,
                    param_type,
                    arg_type,
                    argument_error_row,
                    index,
                    ..
                } => {
                    if let Err(err) = self.ctx.unify(param_type, arg_type) {
                        let arg = self.ctx.resolve(arg_type);
                        let param = self.ctx.resolve(param_type);
                        if arg.is_result() && !param.is_result() {
                            let mut namer = TypeNamer::new();
                            let row_text = argument_error_row
                                .as_ref()
                                .map(|r| r.labels().collect::<Vec<_>>().join(", "))
                                .unwrap_or_default();
                            self.solution
                                .diagnostics
                                .error(
                                    DiagnosticKind::InfectiousCallResultMismatch,
                                    format!(
                                        "this argument carries errors <{row_text}> but the \
                                         function expects {}",
                                        format_type_with(&param, &mut namer)
                                    ),
                                    self.span_of(*argument),
                                )
                                .detail("argument_index", index.to_string())
                                .detail("row", row_text)
                                .hint("match on the result to discharge its errors first")
                                .emit();
                        } else {
                            self.report_mismatch(err, self.span_of(*argument));
                        }
                    }
                }
                ConstraintStub::HasField {
                    record,
                    record_type,
                    field,
                    result_type,
                } => {
                    let resolved = self.ctx.resolve(record_type);
                    match &resolved {
                        Type::Record(fields) => match fields.get(field) {
                            Some(field_ty) => {
                                if let Err(err) = self.ctx.unify(result_type, field_ty) {
                                    self.report_mismatch(err, self.span_of(*record));
                                }
                            }
                            None => {
                                self.solution
                                    .diagnostics
                                    .error(
                                        DiagnosticKind::UnknownField,
                                        format!("no field `{field}` on record"),
                                        self.span_of(*record),
                                    )
                                    .emit();
                            }
                        },
                        Type::Var(_) | Type::Unknown(_) => {
                            self.solution
                                .diagnostics
                                .error(
                                    DiagnosticKind::UnresolvedUnification,
                                    format!(
                                        "cannot resolve field `{field}`: record type is unknown"
                                    ),
                                    self.span_of(*record),
                                )
                                .emit();
                        }
                        other => {
                            let mut namer = TypeNamer::new();
                            self.solution
                                .diagnostics
                                .error(
                                    DiagnosticKind::UnknownField,
                                    format!(
                                        "field access on non-record type {}",
                                        format_type_with(other, &mut namer)
                                    ),
                                    self.span_of(*record),
                                )
                                .emit();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Phase 3: operand kinds.
    fn numeric_boolean(&mut self) {
        for index in 0..self.inference.stubs.len() {
            let (operand, operand_type, want) = match self.inference.stubs[index].clone() {
                ConstraintStub::Numeric {
                    operand,
                    operand_type,
                } => (operand, operand_type, Type::Int),
                ConstraintStub::Boolean {
                    operand,
                    operand_type,
                } => (operand, operand_type, Type::Bool),
                _ => continue,
            };
            if let Err(err) = self.ctx.unify(&operand_type, &want) {
                // An infectious operand was already reported in phase 2.
                if crate::infer::is_infectious_mismatch(&err) {
                    continue;
                }
                let span = self.span_of(operand);
                self.report_mismatch(err, span);
            }
        }
    }

    /// Phase 4: unify branch result types of each join.
    fn branch_joins(&mut self) {
        for index in 0..self.inference.stubs.len() {
            let ConstraintStub::BranchJoin {
                branches,
                result_type,
                ..
            } = self.inference.stubs[index].clone()
            else {
                continue;
            };
            for (branch_node, branch_ty) in &branches {
                if let Err(_err) = self.ctx.unify(&result_type, branch_ty) {
                    let mut namer = TypeNamer::new();
                    let joined = self.ctx.resolve(&result_type);
                    let this = self.ctx.resolve(branch_ty);
                    self.solution
                        .diagnostics
                        .error(
                            DiagnosticKind::BranchJoinMismatch,
                            format!(
                                "match arms disagree: this arm has type {}, previous arms {}",
                                format_type_with(&this, &mut namer),
                                format_type_with(&joined, &mut namer)
                            ),
                            self.span_of(*branch_node),
                        )
                        .emit();
                }
            }
        }
    }

    /// Phase 5: propagate constraint labels in emission order.
    fn propagate(&mut self) {
        for stub in &self.inference.stubs {
            match stub {
                ConstraintStub::Source { node, label } => {
                    merge_label(&mut self.solution.labels, *node, label.clone());
                }
                ConstraintStub::Flow { from, to } => {
                    self.solution.flow_edges.push((*from, *to));
                    let incoming: Vec<ConstraintLabel> = self
                        .solution
                        .labels
                        .get(from)
                        .map(|m| m.values().cloned().collect())
                        .unwrap_or_default();
                    for label in incoming {
                        merge_label(&mut self.solution.labels, *to, label);
                    }
                }
                ConstraintStub::Rewrite { node, remove, add } => {
                    apply_rewrite(&mut self.solution.labels, *node, remove, add.as_ref());
                }
                ConstraintStub::Alias { left, right } => {
                    let mut combined: IndexMap<Domain, ConstraintLabel> = IndexMap::new();
                    for side in [left, right] {
                        if let Some(map) = self.solution.labels.get(side) {
                            for label in map.values() {
                                merge_into(&mut combined, label.clone());
                            }
                        }
                    }
                    if !combined.is_empty() {
                        self.solution.labels.insert(*left, combined.clone());
                        self.solution.labels.insert(*right, combined);
                    }
                }
                _ => {}
            }
        }
    }

    /// Phase 6: pairwise conflict detection per node.
    fn detect_conflicts(&mut self) {
        let mut nodes: Vec<NodeId> = self.solution.labels.keys().copied().collect();
        nodes.sort_by_key(|n| n.as_u32());
        for node in nodes {
            let map = &self.solution.labels[&node];
            let labels: Vec<&ConstraintLabel> = map.values().collect();
            let mut conflict = None;
            for (i, a) in labels.iter().enumerate() {
                for b in &labels[i + 1..] {
                    if a.conflicts_with(b) {
                        conflict = Some(((*a).clone(), (*b).clone()));
                    }
                }
            }
            if let Some((a, b)) = conflict {
                self.solution
                    .diagnostics
                    .error(
                        DiagnosticKind::IncompatibleConstraints,
                        format!("incompatible constraints at this node: {a:?} vs {b:?}"),
                        self.span_of(node),
                    )
                    .emit();
            }
        }
    }

    /// Phase 7: every function's return labels must be fulfilled by its
    /// return type.
    fn boundary_checks(&mut self) {
        for boundary in &self.inference.functions {
            let Some(pending) = self.solution.error_row(boundary.return_node).cloned() else {
                continue;
            };
            if pending.cases.is_empty() {
                continue;
            }

            let declared = match &boundary.declared_return {
                Some(ty) => self.ctx.resolve(ty),
                None => self.ctx.resolve(&boundary.result_type),
            };

            let fulfilled = match declared.result_row() {
                Some(row) => {
                    let row = self.ctx.subst.apply_row(row);
                    row.covers(&pending)
                }
                None => false,
            };

            if !fulfilled {
                let name = boundary.name.as_deref().unwrap_or("<anonymous>");
                let mut namer = TypeNamer::new();
                let row_text = pending.labels().collect::<Vec<_>>().join(", ");
                self.solution
                    .diagnostics
                    .error(
                        DiagnosticKind::BoundaryViolation,
                        format!(
                            "function `{name}` can return errors <{row_text}> but its return \
                             type {} does not carry them",
                            format_type_with(&declared, &mut namer)
                        ),
                        boundary.span,
                    )
                    .detail("function", name.to_string())
                    .detail("row", row_text)
                    .hint("declare the return type as Result<_, _> or discharge with a match")
                    .emit();
            }
        }
    }

    fn report_mismatch(&mut self, err: crate::types::UnifyError, span: Span) {
        use crate::types::UnifyError;
        let mut namer = TypeNamer::new();
        match err {
            UnifyError::Mismatch { left, right } => {
                let left = self.ctx.resolve(&left);
                let right = self.ctx.resolve(&right);
                self.solution
                    .diagnostics
                    .error(
                        DiagnosticKind::TypeMismatch,
                        format!(
                            "Type mismatch: cannot unify {} with {}",
                            format_type_with(&left, &mut namer),
                            format_type_with(&right, &mut namer)
                        ),
                        span,
                    )
                    .emit();
            }
            UnifyError::Occurs { var, ty } => {
                let var_name = namer.name_of(var);
                self.solution
                    .diagnostics
                    .error(
                        DiagnosticKind::OccursCheck,
                        format!(
                            "occurs check: cannot construct the infinite type {var_name} = {}",
                            format_type_with(&ty, &mut namer)
                        ),
                        span,
                    )
                    .emit();
            }
            UnifyError::TupleArity { left, right } => {
                self.solution
                    .diagnostics
                    .error(
                        DiagnosticKind::TupleArityMismatch,
                        format!("tuple arity mismatch: {left} elements vs {right}"),
                        span,
                    )
                    .emit();
            }
        }
    }
}

fn merge_label(
    labels: &mut HashMap<NodeId, IndexMap<Domain, ConstraintLabel>>,
    node: NodeId,
    label: ConstraintLabel,
) {
    merge_into(labels.entry(node).or_default(), label);
}

fn merge_into(map: &mut IndexMap<Domain, ConstraintLabel>, label: ConstraintLabel) {
    let domain = label.domain();
    match map.get(&domain) {
        Some(existing) => {
            let merged = existing.merge(&label);
            map.insert(domain, merged);
        }
        None => {
            map.insert(domain, label);
        }
    }
}

/// In-place rewrite of one node's label in the domain of `remove`.
fn apply_rewrite(
    labels: &mut HashMap<NodeId, IndexMap<Domain, ConstraintLabel>>,
    node: NodeId,
    remove: &ConstraintLabel,
    add: Option<&ConstraintLabel>,
) {
    let domain = remove.domain();
    if let Some(map) = labels.get_mut(&node) {
        match (map.get(&domain), remove) {
            (Some(ConstraintLabel::Error(current)), ConstraintLabel::Error(to_remove)) => {
                let mut remaining = current.clone();
                for label in to_remove.cases.keys() {
                    remaining.cases.shift_remove(label);
                }
                if remaining.cases.is_empty() {
                    map.shift_remove(&domain);
                } else {
                    map.insert(domain, ConstraintLabel::Error(remaining));
                }
            }
            (Some(_), _) => {
                map.shift_remove(&domain);
            }
            (None, _) => {}
        }
    }
    if let Some(add) = add {
        merge_label(labels, node, add.clone());
    }
}
