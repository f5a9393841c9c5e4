// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{build_graph, load_and_validate, topological_order, ConfigFile};
use crate::engine::{RunReport, Scheduler, SchedulerOptions};
use crate::errors::{JobloopError, Result};
use crate::exec::{CommandDriver, JobRecord, JobStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - job graph + command driver
/// - the scheduling loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let graph = build_graph(&cfg)?;
    let options = scheduler_options(&cfg, &args);
    let max_failures = args
        .max_consecutive_failures
        .unwrap_or(cfg.config.max_consecutive_failures);
    let driver = CommandDriver::new(max_failures);

    // Ctrl-C → drain, abort, then report the interrupt.
    let (interrupt_tx, interrupt_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        if interrupt_tx.send(()).await.is_err() {
            debug!("Ctrl+C after the job loop finished; nothing to interrupt");
        }
    });

    let mut scheduler = Scheduler::new(graph, driver, options)?.with_interrupt(interrupt_rx);
    info!(jobs = scheduler.workers(), "running job graph");

    let report = scheduler.run().await?;
    let driver = scheduler.into_driver();
    print_summary(&report, driver.records());

    match driver.failed_count() {
        0 => Ok(()),
        n => Err(JobloopError::JobsFailed(n)),
    }
}

/// `[config]` values with CLI overrides applied.
fn scheduler_options(cfg: &ConfigFile, args: &CliArgs) -> SchedulerOptions {
    let mut options = cfg.config.scheduler_options();
    if let Some(jobs) = args.jobs {
        options.jobs = jobs;
    }
    if let Some(ref abort_file) = args.abort_file {
        options.abort_file = Some(abort_file.clone());
    }
    if args.no_dynamic_poll {
        options.dynamic_poll_interval = false;
    }
    options
}

fn print_summary(report: &RunReport, records: &[JobRecord]) {
    println!();
    for record in records {
        let status = match record.status {
            JobStatus::Passed => "PASSED".to_string(),
            JobStatus::Failed(code) => format!("FAILED (exit {code})"),
            JobStatus::Skipped => "SKIPPED".to_string(),
            JobStatus::Aborted => "NOT RUN".to_string(),
        };
        if record.attempts > 1 {
            println!("  {:<30} {} after {} attempts", record.name, status, record.attempts);
        } else {
            println!("  {:<30} {}", record.name, status);
        }
    }
    println!(
        "{} job(s) dispatched ({} retries), {} not run ({:?})",
        report.dispatched, report.requeued, report.skipped, report.stop
    );
}

/// Simple dry-run output: tasks in dispatch order with their commands.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    println!("jobloop dry-run");
    println!("  config.jobs = {}", cfg.config.jobs);
    if let Some(ref abort_file) = cfg.config.abort_file {
        println!("  config.abort_file = {}", abort_file.display());
    }
    println!(
        "  config.max_consecutive_failures = {}",
        cfg.config.max_consecutive_failures
    );
    println!();

    println!("tasks ({}):", cfg.task.len());
    for name in topological_order(&cfg.task)? {
        let task = &cfg.task[name];
        println!("  - {name}");
        if task.is_barrier() {
            println!("      barrier");
        }
        for cmd in task.commands() {
            println!("      cmd: {cmd}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(retries) = task.retries {
            println!("      retries: {retries}");
        }
        if task.skip {
            println!("      skip: true");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
