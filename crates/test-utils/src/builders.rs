#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use jobloop::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = jobs;
        self
    }

    pub fn abort_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config.abort_file = Some(path.into());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.config.retries = retries;
        self
    }

    pub fn max_consecutive_failures(mut self, max: u32) -> Self {
        self.config.config.max_consecutive_failures = max;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task running a single command.
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// A task running `steps` one after another.
    pub fn steps(steps: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                steps: Some(steps.iter().map(|s| s.to_string()).collect()),
                ..TaskConfig::default()
            },
        }
    }

    /// A task that runs nothing.
    pub fn barrier() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.task.retries = Some(retries);
        self
    }

    pub fn skip(mut self, val: bool) -> Self {
        self.task.skip = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
