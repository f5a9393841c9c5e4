// src/types.rs

use std::fmt;

/// Identifier of a node in a [`DependencyGraph`](crate::dag::DependencyGraph).
///
/// Ids are assigned monotonically starting at 1; id 0 is the implicit root
/// that every node without explicit prerequisites depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The always-satisfied root node.
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Position of this node in the graph's node table.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping passed to the driver alongside every dispatched item.
///
/// `slot` is stable for the lifetime of a worker slot, so drivers can use it
/// to pick worker-local resources (temp dirs, simulator ids, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobInfo {
    pub slot: usize,
    pub retry_count: u32,
}
