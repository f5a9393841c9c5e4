// tests/scheduler_scenarios.rs

mod common;
use crate::common::{fast_options, init_tracing, with_timeout, DriverEvent, FakeDriver};

use std::error::Error;

use tokio::sync::mpsc;

use jobloop::dag::DependencyGraph;
use jobloop::engine::{Scheduler, StopReason};
use jobloop::errors::JobloopError;
use jobloop::fs::mock::MockFileSystem;
use jobloop::types::JobInfo;

type TestResult = Result<(), Box<dyn Error>>;

fn info(slot: usize, retry_count: u32) -> JobInfo {
    JobInfo { slot, retry_count }
}

#[tokio::test]
async fn prerequisite_is_collected_before_dependent_is_spawned() -> TestResult {
    init_tracing();

    for jobs in [1, 2] {
        let mut graph = DependencyGraph::new();
        let a = graph.add_job("a", []);
        graph.add_job("b", [a]);

        let mut scheduler = Scheduler::new(graph, FakeDriver::new().busy_polls(2), fast_options(jobs))?;
        let report = with_timeout(scheduler.run()).await?;

        assert_eq!(report.stop, StopReason::Completed);
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.skipped, 0);

        let events = scheduler.driver().events();
        assert_eq!(
            events,
            &[
                DriverEvent::Spawn { item: "a", info: info(0, 0) },
                DriverEvent::Collect { item: "a", resolved: false, info: Some(info(0, 0)) },
                DriverEvent::Spawn { item: "b", info: info(0, 0) },
                DriverEvent::Collect { item: "b", resolved: false, info: Some(info(0, 0)) },
            ],
            "unexpected call sequence with {jobs} worker(s)"
        );
    }
    Ok(())
}

#[tokio::test]
async fn resolved_spawns_never_exceed_worker_count() -> TestResult {
    init_tracing();

    let driver = FakeDriver::new().resolve_on_spawn();
    let mut scheduler = Scheduler::from_items(1..=5, driver, fast_options(2))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.dispatched, 5);

    let driver = scheduler.driver();
    let collects = driver
        .events()
        .iter()
        .filter(|e| matches!(e, DriverEvent::Collect { resolved: true, info: Some(_), .. }))
        .count();
    assert_eq!(collects, 5);
    assert!(driver.skipped().is_empty());
    assert!(driver.max_in_flight() <= 2, "max in flight was {}", driver.max_in_flight());
    Ok(())
}

#[tokio::test]
async fn too_many_errors_skips_undispatched_nodes() -> TestResult {
    init_tracing();

    let driver = FakeDriver::new().trip_on_collect(3);
    let mut scheduler =
        Scheduler::from_items(["a", "b", "c", "d", "e", "f"], driver, fast_options(1))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::TooManyErrors);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.skipped, 3);

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["a", "b", "c"]);
    assert_eq!(driver.collected(), vec!["a", "b", "c"]);
    assert_eq!(driver.skipped(), vec!["d", "e", "f"]);
    Ok(())
}

#[tokio::test]
async fn abort_file_stops_dispatch_and_collects_running_slots() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let hook_fs = fs.clone();
    let driver = FakeDriver::new().busy_polls(3).on_spawn(move |_, n| {
        if n == 2 {
            hook_fs.add_file("ABORT", "");
        }
    });

    let mut options = fast_options(2);
    options.abort_file = Some("ABORT".into());

    let mut scheduler = Scheduler::with_fs(
        DependencyGraph::from_items(["a", "b", "c", "d", "e", "f"]),
        driver,
        options,
        fs,
    )?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::AbortFile);
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.skipped, 4);

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["a", "b"]);

    let mut collected = driver.collected();
    collected.sort();
    assert_eq!(collected, vec!["a", "b"]);
    assert_eq!(driver.skipped(), vec!["c", "d", "e", "f"]);
    Ok(())
}

#[tokio::test]
async fn abort_file_waits_for_chain_and_skips_its_leftovers_once() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let hook_fs = fs.clone();
    let driver = FakeDriver::new().busy_polls(3).on_spawn(move |_, n| {
        if n == 1 {
            hook_fs.add_file("ABORT", "");
        }
    });

    let mut options = fast_options(2);
    options.abort_file = Some("ABORT".into());

    let mut graph = DependencyGraph::new();
    graph.add_chain(vec!["c1", "c2", "c3"], []);
    graph.add_job("x", []);
    graph.add_job("y", []);

    let mut scheduler = Scheduler::with_fs(graph, driver, options, fs)?;
    let report = with_timeout(scheduler.run()).await?;

    // c1 and x finish in the same sweep; c2 is started before the next
    // abort-file check and is waited on by the abort.
    assert_eq!(report.stop, StopReason::AbortFile);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.skipped, 2);

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["c1", "x", "c2"]);
    assert_eq!(driver.collected(), vec!["c1", "x", "c2"]);
    assert_eq!(driver.skipped(), vec!["c3", "y"]);
    Ok(())
}

#[tokio::test]
async fn abort_file_present_at_start_runs_nothing() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("ABORT", "");

    let mut options = fast_options(2);
    options.abort_file = Some("ABORT".into());

    let mut graph = DependencyGraph::new();
    let a = graph.add_job("a", []);
    let gate = graph.add_barrier([a]);
    graph.add_chain(vec!["b1", "b2"], [gate]);

    let mut scheduler = Scheduler::with_fs(graph, FakeDriver::new(), options, fs)?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::AbortFile);
    assert_eq!(report.dispatched, 0);
    assert!(scheduler.driver().spawned().is_empty());
    assert_eq!(scheduler.driver().skipped(), vec!["a", "b1", "b2"]);
    Ok(())
}

#[tokio::test]
async fn interrupt_drains_skips_and_reports_error() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<()>(1);
    let driver = FakeDriver::new().busy_polls(3).on_spawn(move |_, n| {
        if n == 2 {
            let _ = tx.try_send(());
        }
    });

    let mut scheduler =
        Scheduler::from_items(["a", "b", "c", "d", "e"], driver, fast_options(2))?.with_interrupt(rx);
    let result = with_timeout(scheduler.run()).await;

    assert!(
        matches!(result, Err(JobloopError::Interrupted)),
        "expected Interrupted, got {:?}",
        result
    );

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["a", "b"]);
    let mut collected = driver.collected();
    collected.sort();
    assert_eq!(collected, vec!["a", "b"]);
    assert_eq!(driver.skipped(), vec!["c", "d", "e"]);
    Ok(())
}

#[tokio::test]
async fn interrupt_after_graph_is_exhausted_skips_rest_of_chain() -> TestResult {
    init_tracing();

    // The only node is handed out on the first fill, so the interrupt lands
    // while the loop is draining the chain.
    let (tx, rx) = mpsc::channel::<()>(1);
    let driver = FakeDriver::new().busy_polls(3).on_spawn(move |_, n| {
        if n == 1 {
            let _ = tx.try_send(());
        }
    });

    let mut graph = DependencyGraph::new();
    graph.add_chain(vec!["c1", "c2", "c3"], []);

    let mut scheduler = Scheduler::new(graph, driver, fast_options(2))?.with_interrupt(rx);
    let result = with_timeout(scheduler.run()).await;

    assert!(
        matches!(result, Err(JobloopError::Interrupted)),
        "expected Interrupted, got {:?}",
        result
    );

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["c1"]);
    assert_eq!(driver.collected(), vec!["c1"]);
    assert_eq!(driver.skipped(), vec!["c2", "c3"]);
    Ok(())
}

#[tokio::test]
async fn dropped_interrupt_sender_is_ignored() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<()>(1);
    drop(tx);

    let mut scheduler =
        Scheduler::from_items(["a", "b"], FakeDriver::new(), fast_options(1))?.with_interrupt(rx);
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(scheduler.driver().collected(), vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn chain_runs_in_order_on_one_slot() -> TestResult {
    init_tracing();

    let mut graph = DependencyGraph::new();
    let chain = graph.add_chain(vec!["c1", "c2", "c3"], []);
    graph.add_job("after", [chain]);

    let mut scheduler = Scheduler::new(graph, FakeDriver::new().busy_polls(1), fast_options(2))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.dispatched, 4);

    let events = scheduler.driver().events();
    let expected: Vec<DriverEvent<&str>> = ["c1", "c2", "c3", "after"]
        .into_iter()
        .flat_map(|item| {
            [
                DriverEvent::Spawn { item, info: info(0, 0) },
                DriverEvent::Collect { item, resolved: false, info: Some(info(0, 0)) },
            ]
        })
        .collect();
    assert_eq!(events, expected.as_slice());
    Ok(())
}

#[tokio::test]
async fn requeued_item_is_retried_before_the_rest_of_its_chain() -> TestResult {
    init_tracing();

    let mut graph = DependencyGraph::new();
    graph.add_chain(vec!["s1", "s2"], []);

    let driver = FakeDriver::new().requeue_once("s1");
    let mut scheduler = Scheduler::new(graph, driver, fast_options(1))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.dispatched, 3, "retries count as dispatches");
    assert_eq!(report.requeued, 1);

    let driver = scheduler.driver();
    assert_eq!(driver.spawned(), vec!["s1", "s1", "s2"]);

    let s1_infos: Vec<JobInfo> = driver
        .events()
        .iter()
        .filter_map(|e| match e {
            DriverEvent::Spawn { item: "s1", info } => Some(*info),
            _ => None,
        })
        .collect();
    assert_eq!(s1_infos, vec![info(0, 0), info(0, 1)]);
    Ok(())
}

#[tokio::test]
async fn too_many_errors_skips_rest_of_chain() -> TestResult {
    init_tracing();

    let mut graph = DependencyGraph::new();
    let chain = graph.add_chain(vec!["s1", "s2", "s3"], []);
    graph.add_job("later", [chain]);

    let driver = FakeDriver::new().trip_on_collect(1);
    let mut scheduler = Scheduler::new(graph, driver, fast_options(1))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::TooManyErrors);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.skipped, 3);
    assert_eq!(scheduler.driver().skipped(), vec!["s2", "s3", "later"]);
    Ok(())
}

#[tokio::test]
async fn too_many_errors_after_exhaustion_stops_remaining_chain_only() -> TestResult {
    init_tracing();

    let mut graph = DependencyGraph::new();
    graph.add_job("a", []);
    graph.add_chain(vec!["c1", "c2", "c3"], []);

    // Collect order is a, c1, c2; the graph is exhausted by then.
    let driver = FakeDriver::new().trip_on_collect(3);
    let mut scheduler = Scheduler::new(graph, driver, fast_options(2))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(scheduler.driver().spawned(), vec!["a", "c1", "c2"]);
    assert_eq!(scheduler.driver().skipped(), vec!["c3"]);
    Ok(())
}

#[tokio::test]
async fn driver_error_stops_the_run() -> TestResult {
    init_tracing();

    let driver = FakeDriver::new().fail_on_collect("b");
    let mut scheduler = Scheduler::from_items(["a", "b", "c"], driver, fast_options(1))?;
    let result = with_timeout(scheduler.run()).await;

    assert!(
        matches!(result, Err(JobloopError::Other(_))),
        "expected driver error, got {:?}",
        result
    );
    assert_eq!(scheduler.driver().spawned(), vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn barrier_only_graph_completes_without_dispatch() -> TestResult {
    init_tracing();

    let mut graph: DependencyGraph<&str> = DependencyGraph::new();
    let first = graph.add_barrier([]);
    graph.add_barrier([first]);

    let mut scheduler = Scheduler::new(graph, FakeDriver::new(), fast_options(3))?;
    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.dispatched, 0);
    assert!(scheduler.driver().events().is_empty());
    Ok(())
}

#[test]
fn zero_jobs_uses_available_parallelism() -> TestResult {
    let scheduler = Scheduler::from_items(["a"], FakeDriver::new(), fast_options(0))?;
    assert!(scheduler.workers() >= 1);
    Ok(())
}

#[test]
fn cyclic_graph_is_rejected_up_front() {
    let mut other: DependencyGraph<&str> = DependencyGraph::new();
    let first = other.add_job("x", []);
    let second = other.add_job("y", []);

    let mut graph = DependencyGraph::new();
    graph.add_job("a", [second]);
    graph.add_job("b", [first]);

    let result = Scheduler::new(graph, FakeDriver::new(), fast_options(1));
    assert!(matches!(result, Err(JobloopError::DagCycle(_))));
}
