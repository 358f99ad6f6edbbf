//! Per-node inference records.

use std::collections::HashMap;

use workman_core::{NodeId, Span};

use crate::types::{Scheme, Type};

/// What inference recorded for one node.
#[derive(Debug, Clone)]
pub struct Mark {
    pub span: Span,
    /// Inferred type; read back through the substitution.
    pub ty: Type,
    /// Expected type from an annotation, when one applied here.
    pub expected: Option<Type>,
    /// Scheme reference for binder nodes.
    pub scheme: Option<Scheme>,
    /// Names in scope at this node, innermost shadowing outermost.
    /// Populated for expression nodes.
    pub scope: Vec<String>,
    /// Indices into the stub list of stubs originating at this node.
    pub stubs: Vec<usize>,
}

/// The marked-AST side table: node ID to inference record.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    map: HashMap<NodeId, Mark>,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, span: Span, ty: Type) {
        self.map.insert(
            node,
            Mark {
                span,
                ty,
                expected: None,
                scheme: None,
                scope: Vec::new(),
                stubs: Vec::new(),
            },
        );
    }

    pub fn set_scope(&mut self, node: NodeId, scope: Vec<String>) {
        if let Some(mark) = self.map.get_mut(&node) {
            mark.scope = scope;
        }
    }

    pub fn set_expected(&mut self, node: NodeId, expected: Type) {
        if let Some(mark) = self.map.get_mut(&node) {
            mark.expected = Some(expected);
        }
    }

    pub fn set_scheme(&mut self, node: NodeId, scheme: Scheme) {
        if let Some(mark) = self.map.get_mut(&node) {
            mark.scheme = Some(scheme);
        }
    }

    pub fn add_stub(&mut self, node: NodeId, stub_index: usize) {
        if let Some(mark) = self.map.get_mut(&node) {
            mark.stubs.push(stub_index);
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&Mark> {
        self.map.get(&node)
    }

    pub fn span_of(&self, node: NodeId) -> Option<Span> {
        self.map.get(&node).map(|m| m.span)
    }

    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.map.get(&node).map(|m| &m.ty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Mark)> {
        self.map.iter().map(|(id, mark)| (*id, mark))
    }
}
