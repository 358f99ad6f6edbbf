//! Constraint stubs: the wire between inference (Layer 1) and the
//! solver (Layer 2).
//!
//! The inferencer emits stubs in post-order while walking the AST; the
//! solver consumes them in emission order, which is therefore already a
//! topological order with respect to data flow. Node IDs key everything;
//! spans come from the marks.

use workman_core::NodeId;

use crate::types::{ErrorRow, Type};

/// Constraint domains. The error domain is fully implemented; `mem` and
/// `hole` are placeholders for future non-monotone domains behind the
/// same propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Error,
    Mem,
    Hole,
}

/// A per-node constraint label, tagged by domain.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintLabel {
    /// Pending error row that must be discharged or carried.
    Error(ErrorRow),
    /// Placeholder memory-capability label.
    Mem(String),
    /// Placeholder hole label.
    Hole(NodeId),
}

impl ConstraintLabel {
    pub fn domain(&self) -> Domain {
        match self {
            ConstraintLabel::Error(_) => Domain::Error,
            ConstraintLabel::Mem(_) => Domain::Mem,
            ConstraintLabel::Hole(_) => Domain::Hole,
        }
    }

    /// Domain-specific merge of two labels on the same node.
    /// Error rows union; the placeholder domains keep the newer label.
    pub fn merge(&self, other: &ConstraintLabel) -> ConstraintLabel {
        match (self, other) {
            (ConstraintLabel::Error(a), ConstraintLabel::Error(b)) => {
                ConstraintLabel::Error(a.union(b))
            }
            _ => other.clone(),
        }
    }

    /// Whether two labels of the same domain are in conflict.
    /// The error domain never conflicts; `mem` conflicts on unequal
    /// payloads; `hole` never conflicts.
    pub fn conflicts_with(&self, other: &ConstraintLabel) -> bool {
        match (self, other) {
            (ConstraintLabel::Mem(a), ConstraintLabel::Mem(b)) => a != b,
            _ => false,
        }
    }
}

/// A constraint emitted by the inferencer for later solving.
#[derive(Debug, Clone)]
pub enum ConstraintStub {
    /// `expected` is the user annotation, `actual` the inferred type.
    Annotation {
        node: NodeId,
        expected: Type,
        actual: Type,
    },

    /// One argument position of a call. `origin` and `result` both name
    /// the call node; `param_type` is the callee's parameter at `index`.
    Call {
        origin: NodeId,
        callee: NodeId,
        argument: NodeId,
        result: NodeId,
        result_type: Type,
        param_type: Type,
        arg_type: Type,
        index: usize,
        argument_error_row: Option<ErrorRow>,
    },

    /// Field access `record.field`.
    HasField {
        record: NodeId,
        record_type: Type,
        field: String,
        result_type: Type,
    },

    /// Operand of an arithmetic/comparison operator: must be `Int`.
    Numeric { operand: NodeId, operand_type: Type },

    /// Operand of a boolean operator: must be `Bool`.
    Boolean { operand: NodeId, operand_type: Type },

    /// Join of match-arm result types.
    BranchJoin {
        origin: NodeId,
        scrutinee: Option<NodeId>,
        branches: Vec<(NodeId, Type)>,
        result_type: Type,
        discharges_result: bool,
        error_row_coverage: Option<ErrorRow>,
    },

    /// Seed a label at a node (e.g. a call producing `Result<T, E>`).
    Source { node: NodeId, label: ConstraintLabel },

    /// Propagate labels from one node to another.
    Flow { from: NodeId, to: NodeId },

    /// In-place label rewrite: `remove` is dropped from the node's label
    /// in its domain, then `add` (if any) is merged back in. Emission
    /// order guarantees this runs before any consumer of the node.
    Rewrite {
        node: NodeId,
        remove: ConstraintLabel,
        add: Option<ConstraintLabel>,
    },

    /// Two nodes share one label set from here on.
    Alias { left: NodeId, right: NodeId },
}

impl ConstraintStub {
    /// The node a diagnostic about this stub should point at.
    pub fn anchor(&self) -> NodeId {
        match self {
            ConstraintStub::Annotation { node, .. } => *node,
            ConstraintStub::Call { argument, .. } => *argument,
            ConstraintStub::HasField { record, .. } => *record,
            ConstraintStub::Numeric { operand, .. } => *operand,
            ConstraintStub::Boolean { operand, .. } => *operand,
            ConstraintStub::BranchJoin { origin, .. } => *origin,
            ConstraintStub::Source { node, .. } => *node,
            ConstraintStub::Flow { to, .. } => *to,
            ConstraintStub::Rewrite { node, .. } => *node,
            ConstraintStub::Alias { left, .. } => *left,
        }
    }
}
