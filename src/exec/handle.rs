// src/exec/handle.rs

use std::future::Future;
use std::pin::Pin;
use std::process::ExitStatus;

use anyhow::Context;
use tokio::process::Child;

use crate::engine::JobHandle;
use crate::errors::Result;

/// A spawned child process, pollable by the scheduling loop.
#[derive(Debug)]
pub struct ChildHandle {
    name: String,
    child: Child,
    status: Option<ExitStatus>,
}

impl ChildHandle {
    pub fn new(name: impl Into<String>, child: Child) -> Self {
        Self {
            name: name.into(),
            child,
            status: None,
        }
    }

    /// Exit status, once the process has been observed to finish.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }
}

impl JobHandle for ChildHandle {
    fn poll(&mut self) -> Result<bool> {
        if self.status.is_none() {
            self.status = self
                .child
                .try_wait()
                .with_context(|| format!("polling process of job '{}'", self.name))?;
        }
        Ok(self.status.is_some())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.status.is_none() {
                let status = self
                    .child
                    .wait()
                    .await
                    .with_context(|| format!("waiting for process of job '{}'", self.name))?;
                self.status = Some(status);
            }
            Ok(())
        })
    }
}
