// tests/engine_slot.rs

mod common;
use crate::common::{with_timeout, DriverEvent, FakeDriver};

use std::error::Error;

use jobloop::dag::WorkItem;
use jobloop::engine::{SlotPoll, WorkerSlot};
use jobloop::types::JobInfo;
use jobloop_test_utils::fake_driver::FakeHandle;

type TestResult = Result<(), Box<dyn Error>>;

fn slot(index: usize, payload: WorkItem<&'static str>) -> WorkerSlot<&'static str, FakeHandle> {
    WorkerSlot::new(index, payload)
}

#[test]
fn new_slot_dispatches_nothing() {
    let worker = slot(3, WorkItem::Chain(vec!["a", "b"]));
    assert_eq!(worker.index(), 3);
    assert_eq!(worker.remaining(), 2);
    assert!(!worker.in_flight());
    assert_eq!(worker.retry_count(), 0);
}

#[test]
fn busy_handle_is_polled_until_done() -> TestResult {
    let mut driver = FakeDriver::new().busy_polls(2);
    let mut worker = slot(1, WorkItem::One("a"));

    assert!(worker.dispatch_next(&mut driver)?);
    assert!(worker.in_flight());
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::Busy);
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::Busy);
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::Free);
    assert!(!worker.in_flight());

    // Chain exhausted.
    assert!(!worker.dispatch_next(&mut driver)?);
    assert_eq!(
        driver.events(),
        &[
            DriverEvent::Spawn { item: "a", info: JobInfo { slot: 1, retry_count: 0 } },
            DriverEvent::Collect {
                item: "a",
                resolved: false,
                info: Some(JobInfo { slot: 1, retry_count: 0 }),
            },
        ]
    );
    Ok(())
}

#[test]
fn resolved_spawn_is_collected_on_first_poll() -> TestResult {
    let mut driver = FakeDriver::new().resolve_on_spawn();
    let mut worker = slot(0, WorkItem::One("a"));

    worker.dispatch_next(&mut driver)?;
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::Free);
    assert!(matches!(
        driver.events().last(),
        Some(DriverEvent::Collect { resolved: true, info: Some(_), .. })
    ));
    Ok(())
}

#[test]
fn requeue_bumps_retry_count_and_retries_same_item() -> TestResult {
    let mut driver = FakeDriver::new().requeue_once("a");
    let mut worker = slot(0, WorkItem::Chain(vec!["a", "b"]));

    worker.dispatch_next(&mut driver)?;
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::Free);
    assert_eq!(worker.retry_count(), 1);
    assert_eq!(worker.remaining(), 2);

    worker.dispatch_next(&mut driver)?;
    worker.poll(&mut driver)?;
    worker.dispatch_next(&mut driver)?;
    worker.poll(&mut driver)?;

    assert_eq!(driver.spawned(), vec!["a", "a", "b"]);
    Ok(())
}

#[test]
fn take_remaining_returns_chain_order() -> TestResult {
    let mut driver = FakeDriver::new();
    let mut worker = slot(0, WorkItem::Chain(vec!["a", "b", "c", "d"]));

    worker.dispatch_next(&mut driver)?;
    assert_eq!(worker.take_remaining(), vec!["b", "c", "d"]);
    assert_eq!(worker.remaining(), 0);
    Ok(())
}

#[test]
fn too_many_errors_is_reported_by_poll() -> TestResult {
    let mut driver = FakeDriver::new().trip_on_collect(1);
    let mut worker = slot(0, WorkItem::One("a"));

    worker.dispatch_next(&mut driver)?;
    assert_eq!(worker.poll(&mut driver)?, SlotPoll::TooManyErrors);
    assert!(!worker.in_flight());
    Ok(())
}

#[tokio::test]
async fn wait_blocks_until_done_then_collects() -> TestResult {
    let mut driver = FakeDriver::new().busy_polls(100);
    let mut worker = slot(0, WorkItem::One("a"));

    worker.dispatch_next(&mut driver)?;
    assert_eq!(with_timeout(worker.wait(&mut driver)).await?, SlotPoll::Free);
    assert_eq!(driver.collected(), vec!["a"]);

    // Nothing in flight any more.
    assert_eq!(worker.wait(&mut driver).await?, SlotPoll::Free);
    Ok(())
}
