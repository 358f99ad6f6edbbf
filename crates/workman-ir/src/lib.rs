//! Back-end-facing intermediate representations for Workman.
//!
//! Two layers, both produced by `workman-compiler` and both immutable
//! once built:
//!
//! - [`core`] - a desugared expression tree (explicit lambdas, lets,
//!   match trees, primitive operators). Types and node identities from
//!   the front end are carried through.
//! - [`mir`] - machine-oriented form: ANF instructions in basic blocks,
//!   constructors laid out as integer-tagged records, pattern matches
//!   compiled away.
//!
//! Both serialize with `serde`; the contract with back ends is that node
//! IDs, spans, tag-table order, export visibility, and constructor
//! arities survive a round trip.

pub mod core;
pub mod mir;
pub mod prim;

#[cfg(test)]
mod core_tests;

pub use prim::PrimOp;

/// Structural defects found by [`mir::validate`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum IrError {
    #[error("tag table for `{type_name}` is not dense: constructor `{ctor}` has tag {tag}, expected {expected}")]
    TagNotDense {
        type_name: String,
        ctor: String,
        tag: u32,
        expected: u32,
    },

    #[error("function `{function}` assigns `{name}` more than once")]
    Reassignment { function: String, name: String },

    #[error("function `{function}` rebinds `{name}` but is not self-recursive")]
    RebindOutsideLoop { function: String, name: String },

    #[error("function `{function}` references undefined block {label}")]
    UnknownBlock { function: String, label: mir::BlockLabel },

    #[error("function `{function}` reads `{name}` before any definition")]
    UndefinedValue { function: String, name: String },
}
