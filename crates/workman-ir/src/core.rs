//! Core IR: the desugared expression tree.
//!
//! Produced from the marked surface AST after solving. Surface sugar is
//! gone by this point: operator applications are either [`PrimOp`]
//! applications or calls to their backing `__op_*` functions, statement
//! blocks are right-nested lets, and first-class matches were already
//! expanded by the parser. Node IDs and spans are carried through so
//! back ends can map output to source.

use serde::{Deserialize, Serialize};
use workman_core::{NodeId, Span};

use crate::PrimOp;

/// A lowered module: type layout info, value bindings, export list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreProgram {
    pub types: Vec<CoreTypeDef>,
    pub bindings: Vec<CoreBinding>,
    pub exports: Vec<String>,
}

/// An ADT carried into Core for the benefit of MIR tag assignment.
/// Constructor order is declaration order and is semantic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreTypeDef {
    pub name: String,
    pub constructors: Vec<CoreCtorDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreCtorDef {
    pub name: String,
    pub arity: usize,
}

/// A top-level value binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreBinding {
    pub name: String,
    pub expr: CoreExpr,
    pub exported: bool,
    pub recursive: bool,
    /// Bindings of one `let rec ... and ...` chain share a group ID;
    /// referencing any sibling counts as self-recursion downstream.
    pub rec_group: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: CoreExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreExprKind {
    Var(String),
    Lit(CoreLit),
    Lam {
        params: Vec<String>,
        body: Box<CoreExpr>,
    },
    App {
        callee: Box<CoreExpr>,
        args: Vec<CoreExpr>,
    },
    Let {
        name: String,
        rhs: Box<CoreExpr>,
        body: Box<CoreExpr>,
    },
    LetRec {
        bindings: Vec<(String, CoreExpr)>,
        body: Box<CoreExpr>,
    },
    Prim {
        op: PrimOp,
        args: Vec<CoreExpr>,
    },
    Ctor {
        type_name: String,
        ctor: String,
        fields: Vec<CoreExpr>,
    },
    Tuple(Vec<CoreExpr>),
    Match {
        scrutinee: Box<CoreExpr>,
        arms: Vec<CoreArm>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreArm {
    pub pattern: CorePat,
    pub body: CoreExpr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorePat {
    pub id: NodeId,
    pub span: Span,
    pub kind: CorePatKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CorePatKind {
    Wildcard,
    Var(String),
    Lit(CoreLit),
    Ctor {
        type_name: String,
        ctor: String,
        args: Vec<CorePat>,
    },
    Tuple(Vec<CorePat>),
}

impl CorePat {
    /// Whether the pattern matches unconditionally.
    pub fn is_irrefutable(&self) -> bool {
        match &self.kind {
            CorePatKind::Wildcard | CorePatKind::Var(_) => true,
            CorePatKind::Tuple(elems) => elems.iter().all(CorePat::is_irrefutable),
            CorePatKind::Lit(_) | CorePatKind::Ctor { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreLit {
    Int(i64),
    Bool(bool),
    Char(char),
    Str(String),
    Unit,
}

impl std::fmt::Display for CoreLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreLit::Int(n) => write!(f, "{n}"),
            CoreLit::Bool(b) => write!(f, "{b}"),
            CoreLit::Char(c) => write!(f, "{c:?}"),
            CoreLit::Str(s) => write!(f, "{s:?}"),
            CoreLit::Unit => f.write_str("()"),
        }
    }
}
