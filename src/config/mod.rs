// src/config/mod.rs

//! Configuration loading and validation for jobloop.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file through a [`FileSystem`](crate::fs::FileSystem) (`loader.rs`).
//! - Validate task references and acyclicity (`validate.rs`).
//! - Turn a validated config into a job graph (`graph.rs`).

pub mod graph;
pub mod loader;
pub mod model;
pub mod validate;

pub use graph::build_graph;
pub use loader::{load_and_validate, load_and_validate_with, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
pub use validate::topological_order;
