// src/dag/graph.rs

use std::collections::BTreeSet;

use tracing::trace;

use crate::types::NodeId;

/// Payload bound to a graph node.
///
/// A `Chain` is executed front-to-back inside the same locked node; the node
/// is only released once every item of the chain has been collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<T> {
    One(T),
    Chain(Vec<T>),
}

impl<T> WorkItem<T> {
    /// Flatten into the ordered list of items to execute.
    pub fn into_items(self) -> Vec<T> {
        match self {
            WorkItem::One(item) => vec![item],
            WorkItem::Chain(items) => items,
        }
    }

    /// Number of items that will be dispatched for this payload.
    pub fn len(&self) -> usize {
        match self {
            WorkItem::One(_) => 1,
            WorkItem::Chain(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<T> for WorkItem<T> {
    fn from(item: T) -> Self {
        WorkItem::One(item)
    }
}

/// Visit state of a node. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    NotVisited,
    Locked,
    Visited,
}

/// Result of asking the graph for the next piece of work.
#[derive(Debug, PartialEq, Eq)]
pub enum Next<T> {
    /// A node whose prerequisites are all visited. It is now locked and must
    /// be handed back with [`DependencyGraph::release`].
    Ready(NodeId, WorkItem<T>),
    /// Unprocessed nodes remain but none is eligible until more releases.
    Blocked,
    /// Every node has been handed out.
    Exhausted,
}

#[derive(Debug)]
struct Node<T> {
    /// `None` once handed out, or from the start for barrier nodes.
    payload: Option<WorkItem<T>>,
    prereqs: BTreeSet<NodeId>,
    state: NodeState,
}

/// Work items plus their prerequisite relationships, drained through a
/// pull-based `next` / `release` protocol.
///
/// Among several eligible nodes, `next` returns the one with the lowest id.
/// That choice is arbitrary but stable for a given sequence of calls; callers
/// must not rely on any ordering between nodes that do not depend on each
/// other.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<Node<T>>,
    /// Nodes not yet handed out by `next`.
    pending: BTreeSet<NodeId>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DependencyGraph<T> {
    /// Create a graph that only holds the root node.
    pub fn new() -> Self {
        let root = Node {
            payload: None,
            prereqs: BTreeSet::new(),
            state: NodeState::NotVisited,
        };

        Self {
            nodes: vec![root],
            pending: BTreeSet::from([NodeId::ROOT]),
        }
    }

    /// Wrap a flat list of independent items into a single-level graph.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut graph = Self::new();
        for item in items {
            graph.add_job(item, []);
        }
        graph
    }

    /// Add a node and return its id.
    ///
    /// A `None` payload makes a barrier node: it is never dispatched, but its
    /// release still unblocks its dependents. An empty prerequisite set means
    /// "depends on the root".
    pub fn add_node(
        &mut self,
        payload: Option<WorkItem<T>>,
        prereqs: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        let mut prereqs: BTreeSet<NodeId> = prereqs.into_iter().collect();
        if prereqs.is_empty() {
            prereqs.insert(NodeId::ROOT);
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            payload,
            prereqs,
            state: NodeState::NotVisited,
        });
        self.pending.insert(id);
        id
    }

    pub fn add_job(&mut self, item: T, prereqs: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add_node(Some(WorkItem::One(item)), prereqs)
    }

    pub fn add_chain(&mut self, items: Vec<T>, prereqs: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add_node(Some(WorkItem::Chain(items)), prereqs)
    }

    pub fn add_barrier(&mut self, prereqs: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add_node(None, prereqs)
    }

    /// Add one node per item, all sharing the same prerequisites.
    pub fn add_nodes(
        &mut self,
        items: impl IntoIterator<Item = T>,
        prereqs: &[NodeId],
    ) -> BTreeSet<NodeId> {
        items
            .into_iter()
            .map(|item| self.add_job(item, prereqs.iter().copied()))
            .collect()
    }

    /// Hand out the next eligible node, locking it.
    ///
    /// Barrier nodes are visited on the spot and never returned.
    pub fn next(&mut self) -> Next<T> {
        loop {
            if self.pending.is_empty() {
                return Next::Exhausted;
            }

            let Some(id) = self.pending.iter().copied().find(|id| self.is_ready(*id)) else {
                return Next::Blocked;
            };

            self.pending.remove(&id);
            let node = &mut self.nodes[id.index()];
            node.state = NodeState::Locked;

            match node.payload.take() {
                Some(payload) => return Next::Ready(id, payload),
                None => {
                    trace!(node = %id, "visiting barrier node");
                    node.state = NodeState::Visited;
                }
            }
        }
    }

    /// Mark a locked node as visited. Releasing a node that is not locked is
    /// a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this graph.
    pub fn release(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        if node.state == NodeState::Locked {
            node.state = NodeState::Visited;
        }
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes not yet handed out (the root included until visited).
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(id.index()).map(|n| n.state)
    }

    pub fn prerequisites(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.nodes.get(id.index()).map(|n| &n.prereqs)
    }

    /// All node ids, root included.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// A node is eligible once every prerequisite is visited. Unknown
    /// prerequisites never become visited.
    fn is_ready(&self, id: NodeId) -> bool {
        self.nodes[id.index()].prereqs.iter().all(|p| {
            self.nodes
                .get(p.index())
                .is_some_and(|n| n.state == NodeState::Visited)
        })
    }
}
