//! Primitive operators shared by Core IR and MIR.

use serde::{Deserialize, Serialize};

/// Operations the runtime implements directly.
///
/// Core lowering turns recognized surface operators into these; anything
/// else stays a call to the operator's backing function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    EqInt,
    NeInt,
    CharEq,
    And,
    Or,
    Not,
    /// Three-way integer comparison producing an `Ordering` value.
    CmpInt,
    Print,
}

impl PrimOp {
    /// Stable lowercase mnemonic used by the textual dumps.
    pub fn mnemonic(self) -> &'static str {
        match self {
            PrimOp::Add => "add",
            PrimOp::Sub => "sub",
            PrimOp::Mul => "mul",
            PrimOp::Div => "div",
            PrimOp::Lt => "lt",
            PrimOp::Gt => "gt",
            PrimOp::Le => "le",
            PrimOp::Ge => "ge",
            PrimOp::EqInt => "eq_int",
            PrimOp::NeInt => "ne_int",
            PrimOp::CharEq => "char_eq",
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::Not => "not",
            PrimOp::CmpInt => "cmp_int",
            PrimOp::Print => "print",
        }
    }

    /// Number of operands the operator consumes.
    pub fn arity(self) -> usize {
        match self {
            PrimOp::Not | PrimOp::Print => 1,
            _ => 2,
        }
    }

    /// Whether both operands must be `Int`.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimOp::Add
                | PrimOp::Sub
                | PrimOp::Mul
                | PrimOp::Div
                | PrimOp::Lt
                | PrimOp::Gt
                | PrimOp::Le
                | PrimOp::Ge
                | PrimOp::CmpInt
        )
    }

    /// Whether all operands must be `Bool`.
    pub fn is_boolean(self) -> bool {
        matches!(self, PrimOp::And | PrimOp::Or | PrimOp::Not)
    }
}

impl std::fmt::Display for PrimOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
