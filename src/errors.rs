// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::NodeId;

#[derive(Error, Debug)]
pub enum JobloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Node {node} depends on unknown node {prereq}")]
    UnknownPrerequisite { node: NodeId, prereq: NodeId },

    #[error("Interrupted by user")]
    Interrupted,

    #[error("{0} job(s) failed")]
    JobsFailed(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, JobloopError>;
