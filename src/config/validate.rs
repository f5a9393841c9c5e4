// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{JobloopError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = JobloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_commands(cfg)?;
    validate_task_dependencies(cfg)?;
    topological_order(&cfg.task)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(JobloopError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.is_some() && task.steps.is_some() {
            return Err(JobloopError::ConfigError(format!(
                "task '{}' sets both `cmd` and `steps`",
                name
            )));
        }
        if task.steps.as_ref().is_some_and(|steps| steps.is_empty()) {
            return Err(JobloopError::ConfigError(format!(
                "task '{}' has an empty `steps` list",
                name
            )));
        }
        if task.commands().iter().any(|cmd| cmd.trim().is_empty()) {
            return Err(JobloopError::ConfigError(format!(
                "task '{}' has an empty command",
                name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(JobloopError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(JobloopError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Task names ordered so that every task comes after its `after` entries.
///
/// Assumes all `after` references name existing tasks.
pub fn topological_order(tasks: &BTreeMap<String, TaskConfig>) -> Result<Vec<&str>> {
    // Edge direction: dep -> task
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        JobloopError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))
    })
}
