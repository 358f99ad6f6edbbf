//! Presenter (Layer 3): per-node typed views for editors.
//!
//! Everything here is read-only over the solver output: final types
//! with the substitution applied, a span index for position queries,
//! hole solutions, match-coverage summaries, and the constraint-flow
//! graph.


use std::collections::HashMap;

use workman_core::{NodeId, Span};

use crate::infer::Inference;
use crate::solve::Solution;
use crate::solve::stubs::{ConstraintLabel, Domain};
use crate::types::{ErrorRow, HoleProvenance, Scheme, Type, TypeCtx, format_type};

/// Final view of one node.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub node: NodeId,
    pub span: Span,
    /// Final type with the substitution applied.
    pub ty: Type,
    pub expected: Option<Type>,
    pub scheme: Option<Scheme>,
    /// Names visible at this node.
    pub scope: Vec<String>,
}

/// Solution state of a user hole.
#[derive(Debug, Clone, PartialEq)]
pub enum HoleSolution {
    Unsolved,
    /// Some structure known, variables remain.
    Partial(Type),
    /// Diagnostics overlap the hole; listed by reason.
    Conflicted(Vec<String>),
    Filled(Type),
}

#[derive(Debug, Clone)]
pub struct HoleView {
    pub node: NodeId,
    pub span: Span,
    pub provenance: HoleProvenance,
    pub solution: HoleSolution,
}

/// Match coverage summary for display.
#[derive(Debug, Clone)]
pub struct CoverageView {
    pub node: NodeId,
    pub span: Span,
    /// The scrutinee's error row, when it was a `Result`.
    pub row: Option<ErrorRow>,
    pub covered: Vec<String>,
    pub missing: Vec<String>,
    pub covers_tail: bool,
    pub discharges_result: bool,
}

/// The constraint-flow graph: per-node labels plus propagation edges.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    /// Node to formatted error-row label.
    pub labels: Vec<(NodeId, String)>,
    pub edges: Vec<(NodeId, NodeId)>,
}

/// The complete Layer 3 artifact.
#[derive(Debug)]
pub struct TypedView {
    nodes: HashMap<NodeId, NodeView>,
    /// (span, node) sorted by span start, then by descending length, so
    /// position queries can scan for the innermost hit.
    span_index: Vec<(Span, NodeId)>,
    pub holes: Vec<HoleView>,
    pub coverage: Vec<CoverageView>,
    pub flow: FlowGraph,
}

impl TypedView {
    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.get(&id)
    }

    /// Resolved type of a node, formatted for display.
    pub fn type_text(&self, id: NodeId) -> Option<String> {
        self.nodes.get(&id).map(|view| format_type(&view.ty))
    }

    /// Innermost node covering a byte offset.
    pub fn node_at(&self, offset: u32) -> Option<&NodeView> {
        let mut best: Option<&NodeView> = None;
        for (span, id) in &self.span_index {
            if span.start > offset {
                break;
            }
            if span.contains(offset) {
                let candidate = &self.nodes[id];
                best = match best {
                    Some(current) if current.span.len() <= span.len() => Some(current),
                    _ => Some(candidate),
                };
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build the typed view from solver output.
pub fn present(inference: &Inference, solution: &Solution, ctx: &TypeCtx) -> TypedView {
    let mut nodes = HashMap::new();
    let mut span_index = Vec::new();

    for (id, mark) in inference.marks.iter() {
        let view = NodeView {
            node: id,
            span: mark.span,
            ty: ctx.resolve(&mark.ty),
            expected: mark.expected.as_ref().map(|t| ctx.resolve(t)),
            scheme: mark.scheme.clone(),
            scope: mark.scope.clone(),
        };
        span_index.push((mark.span, id));
        nodes.insert(id, view);
    }
    span_index.sort_by_key(|(span, _)| (span.start, std::cmp::Reverse(span.len())));

    let holes = inference
        .holes
        .iter()
        .map(|hole| {
            let span = inference.marks.span_of(hole.node).unwrap_or_default();
            let resolved = ctx.resolve(&Type::Var(hole.var));

            let conflicts: Vec<String> = solution
                .diagnostics
                .iter()
                .filter(|d| spans_overlap(d.span, span))
                .map(|d| d.reason().to_string())
                .collect();

            let solution_state = if !conflicts.is_empty() {
                HoleSolution::Conflicted(conflicts)
            } else {
                let mut vars = Vec::new();
                resolved.free_vars(&mut vars);
                if matches!(resolved, Type::Var(_)) {
                    HoleSolution::Unsolved
                } else if vars.is_empty() {
                    HoleSolution::Filled(resolved.clone())
                } else {
                    HoleSolution::Partial(resolved.clone())
                }
            };

            HoleView {
                node: hole.node,
                span,
                provenance: hole.provenance,
                solution: solution_state,
            }
        })
        .collect();

    let coverage = inference
        .matches
        .iter()
        .map(|info| CoverageView {
            node: info.node,
            span: inference.marks.span_of(info.node).unwrap_or_default(),
            row: info.row.clone(),
            covered: info.covered.clone(),
            missing: info.missing.clone(),
            covers_tail: info.covers_tail,
            discharges_result: info.discharges_result,
        })
        .collect();

    let mut labels: Vec<(NodeId, String)> = solution
        .labels
        .iter()
        .filter_map(|(node, map)| {
            map.get(&Domain::Error).map(|label| match label {
                ConstraintLabel::Error(row) => {
                    let text = row.labels().collect::<Vec<_>>().join(", ");
                    (*node, format!("error(<{text}>)"))
                }
                other => (*node, format!("{other:?}")),
            })
        })
        .collect();
    labels.sort_by_key(|(node, _)| node.as_u32());

    TypedView {
        nodes,
        span_index,
        holes,
        coverage,
        flow: FlowGraph {
            labels,
            edges: solution.flow_edges.clone(),
        },
    }
}

fn spans_overlap(a: Span, b: Span) -> bool {
    a.start < b.end && b.start < a.end
}
