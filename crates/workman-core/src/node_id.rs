//! Stable node identities.

use serde::{Deserialize, Serialize};

/// A stable integer identity for a syntactic or inferred entity.
///
/// IDs are dense and monotonically allocated per module. They key the
/// per-node inference marks, constraint labels, and span index, so the
/// same ID must survive from parse through presentation unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense per-module allocator for [`NodeId`]s.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of IDs handed out so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}
