//! Shared primitives for the Workman compiler.
//!
//! Everything here is consumed by both the compiler pipeline and the
//! back-end-facing IR crate: byte-offset spans, stable node identities,
//! and the source-file registry used by multi-module diagnostics.

mod node_id;
mod source;
mod span;

#[cfg(test)]
mod lib_tests;

pub use node_id::{NodeId, NodeIdGen};
pub use source::{SourceFile, SourceId, SourceMap};
pub use span::Span;
