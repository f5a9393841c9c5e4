// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::SchedulerOptions;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// jobs = 4
/// abort_file = "ABORT"
/// max_consecutive_failures = 5
///
/// [task.build]
/// cmd = "make"
///
/// [task.check]
/// steps = ["make check", "make install"]
/// after = ["build"]
/// retries = 1
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section: pool and failure-policy settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of worker slots; `0` uses one per available CPU.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Stop dispatching new jobs as soon as this file exists.
    #[serde(default)]
    pub abort_file: Option<PathBuf>,

    /// Adapt the poll interval to the pool's load.
    #[serde(default = "default_true")]
    pub dynamic_poll_interval: bool,

    /// Abort the run after this many failed jobs in a row; `0` never aborts.
    #[serde(default)]
    pub max_consecutive_failures: u32,

    /// Default number of times a failed job is requeued.
    #[serde(default)]
    pub retries: u32,
}

fn default_jobs() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            abort_file: None,
            dynamic_poll_interval: true,
            max_consecutive_failures: 0,
            retries: 0,
        }
    }
}

impl ConfigSection {
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            jobs: self.jobs,
            abort_file: self.abort_file.clone(),
            dynamic_poll_interval: self.dynamic_poll_interval,
            ..SchedulerOptions::default()
        }
    }
}

/// `[task.<name>]` section.
///
/// A task with neither `cmd` nor `steps` is a barrier: it runs nothing and
/// only groups its `after` dependencies for downstream tasks.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Single shell command.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Shell commands run one after another in the same worker slot.
    #[serde(default)]
    pub steps: Option<Vec<String>>,

    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Per-task requeue budget; falls back to `[config].retries`.
    #[serde(default)]
    pub retries: Option<u32>,

    /// Report the task as skipped without running it.
    #[serde(default)]
    pub skip: bool,
}

impl TaskConfig {
    pub fn is_barrier(&self) -> bool {
        self.cmd.is_none() && self.steps.is_none()
    }

    /// Commands to run, in order.
    pub fn commands(&self) -> Vec<String> {
        match (&self.cmd, &self.steps) {
            (Some(cmd), _) => vec![cmd.clone()],
            (None, Some(steps)) => steps.clone(),
            (None, None) => Vec::new(),
        }
    }

    pub fn effective_retries(&self, default_retries: u32) -> u32 {
        self.retries.unwrap_or(default_retries)
    }
}
