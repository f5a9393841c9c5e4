// src/dag/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::DependencyGraph;
use crate::errors::{JobloopError, Result};

/// Check that a graph can be drained to the end.
///
/// A prerequisite that names a node the graph does not hold, or a cycle,
/// would leave nodes blocked forever while the scheduler keeps polling.
pub fn validate_graph<T>(graph: &DependencyGraph<T>) -> Result<()> {
    // Edge direction: prereq -> node.
    let mut edges: DiGraphMap<usize, ()> = DiGraphMap::new();

    for id in graph.node_ids() {
        edges.add_node(id.index());
        for &prereq in graph.prerequisites(id).into_iter().flatten() {
            if graph.state(prereq).is_none() {
                return Err(JobloopError::UnknownPrerequisite { node: id, prereq });
            }
            edges.add_edge(prereq.index(), id.index(), ());
        }
    }

    match toposort(&edges, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(JobloopError::DagCycle(format!(
            "cycle detected in job graph involving node #{}",
            cycle.node_id()
        ))),
    }
}
