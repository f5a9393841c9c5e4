// src/exec/mod.rs

//! Process execution layer.
//!
//! The engine only knows the [`JobDriver`](crate::engine::JobDriver) and
//! [`JobHandle`](crate::engine::JobHandle) traits. This module provides the
//! implementation that runs shell commands with `tokio::process::Command`:
//!
//! - [`command`] holds the job type and the driver deciding each job's fate.
//! - [`handle`] wraps a child process behind the poll/wait handle contract.

pub mod command;
pub mod handle;

pub use command::{CommandDriver, CommandJob, JobRecord, JobStatus};
pub use handle::ChildHandle;
