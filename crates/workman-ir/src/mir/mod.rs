//! MIR: basic blocks, ANF instructions, tagged constructors.
//!
//! The final front-end artifact. Every non-trivial sub-expression has
//! been hoisted into an instruction with a fresh destination name, ADT
//! values are `{tag, _0, _1, ...}` records selected through per-type tag
//! tables, and pattern matches are compiled to `IfElse` cascades (or to
//! `Switch` terminators inside self-recursive loop bodies).

mod dump;
mod validate;


use serde::{Deserialize, Serialize};
use workman_core::{NodeId, Span};

use crate::PrimOp;

pub use dump::dump;
pub use validate::validate;

/// Value bindings every MIR runtime provides. References to these names
/// resolve outside the program.
pub const RUNTIME_BINDINGS: &[&str] = &[
    "nativeAdd",
    "nativeSub",
    "nativeMul",
    "nativeDiv",
    "nativeCmpInt",
    "nativePrint",
    "print",
];

/// A compiled module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirProgram {
    pub tag_tables: Vec<TagTable>,
    pub functions: Vec<Function>,
    pub exports: Vec<String>,
}

impl MirProgram {
    pub fn tag_table(&self, type_name: &str) -> Option<&TagTable> {
        self.tag_tables.iter().find(|t| t.type_name == type_name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Constructor-to-tag assignment for one ADT.
///
/// Tags are the 0-based declaration index. The order here is the order
/// back ends must preserve; re-exported types reuse the exporting
/// module's table instead of regenerating one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTable {
    pub type_name: String,
    pub constructors: Vec<TagEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    pub tag: u32,
    pub arity: usize,
}

impl TagTable {
    pub fn tag_of(&self, ctor: &str) -> Option<u32> {
        self.constructors
            .iter()
            .find(|c| c.name == ctor)
            .map(|c| c.tag)
    }
}

/// A lowered function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub blocks: Vec<BasicBlock>,
    /// Set when the body references its own name or a sibling of its
    /// recursive binding group. Such functions get a loop wrapper so
    /// tail self-calls can rebind parameters instead of calling.
    pub is_self_recursive: bool,
    pub id: NodeId,
    pub span: Span,
}

/// Label of a basic block, unique within its function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct BlockLabel(pub u32);

impl std::fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: BlockLabel,
    pub instrs: Vec<Inst>,
    pub terminator: Terminator,
}

/// An ANF operand: a named variable or an immediate constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Var(String),
    Int(i64),
    Bool(bool),
    Char(char),
    Str(String),
    Unit,
}

impl Value {
    pub fn var(name: impl Into<String>) -> Self {
        Value::Var(name.into())
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Value::Var(name) => Some(name),
            _ => None,
        }
    }
}

/// One instruction: destination name plus operation.
///
/// Destinations are single-assignment. The one exception is [`InstKind::Rebind`]
/// targeting a parameter inside a self-recursive loop body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inst {
    pub dst: String,
    pub kind: InstKind,
}

impl Inst {
    pub fn new(dst: impl Into<String>, kind: InstKind) -> Self {
        Self {
            dst: dst.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstKind {
    /// Materialize a constant under a name.
    Const(Value),
    Prim {
        op: PrimOp,
        args: Vec<Value>,
    },
    MakeTuple(Vec<Value>),
    GetTuple {
        tuple: Value,
        index: u32,
    },
    /// Closure over a lowered function plus captured environment.
    MakeClosure {
        fun: String,
        env: Vec<Value>,
    },
    Call {
        fun: Value,
        args: Vec<Value>,
    },
    /// Allocate a constructor record `{tag, fields...}`.
    AllocCtor {
        type_name: String,
        tag: u32,
        fields: Vec<Value>,
    },
    GetTag(Value),
    GetField {
        value: Value,
        index: u32,
    },
    /// Value-producing conditional. Both bodies run their instructions
    /// and yield their result into the instruction's destination.
    IfElse {
        cond: Value,
        then_body: Vec<Inst>,
        then_result: Value,
        else_body: Vec<Inst>,
        else_result: Value,
    },
    /// Parameter rebinding ahead of a back-edge branch. Only valid in
    /// self-recursive functions; `dst` must name a parameter.
    Rebind(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Terminator {
    Return(Value),
    Branch(BlockLabel),
    Switch {
        value: Value,
        cases: Vec<SwitchCase>,
        default: Option<BlockLabel>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: i64,
    pub target: BlockLabel,
}
