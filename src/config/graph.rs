// src/config/graph.rs

use std::collections::HashMap;

use crate::config::model::ConfigFile;
use crate::config::validate::topological_order;
use crate::dag::DependencyGraph;
use crate::errors::Result;
use crate::exec::CommandJob;
use crate::types::NodeId;

/// Build the job graph for a validated config.
///
/// Tasks are added in topological order, so node ids follow dependency
/// order. A task with `steps` becomes a chain whose jobs are named
/// `<task>[1]`, `<task>[2]`, ...; a task with neither `cmd` nor `steps`
/// becomes a barrier node.
pub fn build_graph(cfg: &ConfigFile) -> Result<DependencyGraph<CommandJob>> {
    let mut graph = DependencyGraph::new();
    let mut ids: HashMap<&str, NodeId> = HashMap::new();

    for name in topological_order(&cfg.task)? {
        let task = &cfg.task[name];
        let prereqs: Vec<NodeId> = task
            .after
            .iter()
            .filter_map(|dep| ids.get(dep.as_str()).copied())
            .collect();
        let retries = task.effective_retries(cfg.config.retries);

        let id = match (&task.cmd, &task.steps) {
            (Some(cmd), _) => graph.add_job(
                CommandJob::new(name, cmd.as_str())
                    .with_retries(retries)
                    .skipped(task.skip),
                prereqs,
            ),
            (None, Some(steps)) => {
                let jobs = steps
                    .iter()
                    .enumerate()
                    .map(|(i, cmd)| {
                        CommandJob::new(format!("{name}[{}]", i + 1), cmd.as_str())
                            .with_retries(retries)
                            .skipped(task.skip)
                    })
                    .collect();
                graph.add_chain(jobs, prereqs)
            }
            (None, None) => graph.add_barrier(prereqs),
        };

        ids.insert(name, id);
    }

    Ok(graph)
}
