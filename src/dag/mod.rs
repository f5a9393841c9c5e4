// src/dag/mod.rs

//! Dependency graph of work items.
//!
//! - [`graph`] holds the nodes, their prerequisites and the `next` / `release`
//!   protocol the scheduler drives.
//! - [`validate`] rejects graphs that could never be fully drained.

pub mod graph;
pub mod validate;

pub use graph::{DependencyGraph, Next, NodeState, WorkItem};
pub use validate::validate_graph;
