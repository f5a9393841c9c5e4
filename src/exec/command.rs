// src/exec/command.rs

//! Shell-command driver: runs each job with `sh -c` (or `cmd /C` on
//! Windows) and judges it by exit status.

use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::engine::breaker::Verdict;
use crate::engine::{FailureBreaker, JobDriver, Outcome, Spawned};
use crate::errors::Result;
use crate::exec::handle::ChildHandle;
use crate::types::JobInfo;

/// One shell command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandJob {
    pub name: String,
    pub cmd: String,
    /// How many times a failure is requeued before it counts.
    pub retries: u32,
    /// Report the job as skipped instead of running it.
    pub skip: bool,
}

impl CommandJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            retries: 0,
            skip: false,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn skipped(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}

/// Final status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Passed,
    /// Exit code, or `-1` when the process was killed by a signal.
    Failed(i32),
    /// Not run because the job is marked `skip`.
    Skipped,
    /// Not run because the loop was aborted first.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub status: JobStatus,
    /// Number of times the job was started.
    pub attempts: u32,
}

/// [`JobDriver`] for [`CommandJob`]s.
///
/// Failed jobs are requeued while they have retries left. Once a failure is
/// final it feeds the consecutive-failure breaker, which stops the loop when
/// it trips.
#[derive(Debug, Default)]
pub struct CommandDriver {
    breaker: FailureBreaker,
    records: Vec<JobRecord>,
}

impl CommandDriver {
    /// `max_consecutive_failures == 0` disables the breaker.
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            breaker: FailureBreaker::new(max_consecutive_failures),
            records: Vec::new(),
        }
    }

    /// One record per collected job, in collection order.
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Failed(_)))
            .count()
    }

    fn record(&mut self, job: &CommandJob, status: JobStatus, attempts: u32) -> Outcome {
        self.records.push(JobRecord {
            name: job.name.clone(),
            status,
            attempts,
        });

        let verdict = match status {
            JobStatus::Passed => Verdict::Passed,
            JobStatus::Failed(_) => Verdict::Failed,
            JobStatus::Skipped | JobStatus::Aborted => Verdict::Ignored,
        };

        if self.breaker.record(verdict) {
            Outcome::TooManyErrors
        } else {
            Outcome::Done
        }
    }
}

impl JobDriver for CommandDriver {
    type Item = CommandJob;
    type Handle = ChildHandle;

    fn spawn(&mut self, job: &CommandJob, info: JobInfo) -> Result<Spawned<ChildHandle>> {
        if job.skip {
            info!(job = %job.name, "job marked skip; not running");
            return Ok(Spawned::Skipped);
        }

        info!(
            job = %job.name,
            slot = info.slot,
            retry_count = info.retry_count,
            cmd = %job.cmd,
            "starting job process"
        );

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&job.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&job.cmd);
            c
        };

        cmd.env("WORKER_ID", info.slot.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning process for job '{}'", job.name))?;

        Ok(Spawned::Running(ChildHandle::new(job.name.clone(), child)))
    }

    fn collect(
        &mut self,
        job: &CommandJob,
        handle: Spawned<ChildHandle>,
        info: Option<JobInfo>,
    ) -> Result<Outcome> {
        let attempts = info.map(|i| i.retry_count + 1).unwrap_or(0);

        let handle = match (handle, info) {
            (Spawned::Skipped, None) => {
                return Ok(self.record(job, JobStatus::Aborted, 0));
            }
            (Spawned::Skipped, Some(_)) => {
                return Ok(self.record(job, JobStatus::Skipped, 0));
            }
            (Spawned::Running(handle), _) => handle,
        };

        let status = handle.exit_status();
        if status.is_some_and(|s| s.success()) {
            info!(job = %job.name, attempts, "PASSED");
            return Ok(self.record(job, JobStatus::Passed, attempts));
        }

        let code = status.and_then(|s| s.code()).unwrap_or(-1);
        let retry_count = info.map(|i| i.retry_count).unwrap_or(0);
        if retry_count < job.retries {
            warn!(
                job = %job.name,
                exit_code = code,
                retry_count,
                retries = job.retries,
                "job failed; requeueing"
            );
            return Ok(Outcome::Requeue);
        }

        error!(job = %job.name, exit_code = code, attempts, "FAILED");
        Ok(self.record(job, JobStatus::Failed(code), attempts))
    }
}
