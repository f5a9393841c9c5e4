// src/engine/mod.rs

//! Worker pool that drains a [`DependencyGraph`](crate::dag::DependencyGraph).
//!
//! The engine never runs work itself. A [`JobDriver`] starts each item as an
//! external operation and later inspects the finished operation:
//!
//! - [`slot`] drives one locked node (single item or chain) through the driver.
//! - [`scheduler`] owns the slots, fills them from the graph, polls them and
//!   implements cancellation and shutdown.
//! - [`poll`] adapts the delay between poll sweeps.
//! - [`breaker`] is a ready-made consecutive-failure policy for drivers.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::JobInfo;

pub mod breaker;
pub mod poll;
pub mod scheduler;
pub mod slot;

pub use breaker::{FailureBreaker, Verdict};
pub use poll::PollInterval;
pub use scheduler::{RunReport, Scheduler, SchedulerOptions, StopReason};
pub use slot::{SlotPoll, WorkerSlot};

/// Minimal contract the engine needs from a started operation.
pub trait JobHandle {
    /// Returns `true` once the operation has finished.
    fn poll(&mut self) -> Result<bool>;

    /// Block until the operation has finished.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// What `spawn` started, and what `collect` is handed back.
#[derive(Debug)]
pub enum Spawned<H> {
    /// A real operation that has to be polled.
    Running(H),
    /// Nothing to wait for. Returned by `spawn` when the item resolved
    /// without starting anything, and passed to `collect` for items that
    /// were skipped because the run was aborted.
    Skipped,
}

impl<H> Spawned<H> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Spawned::Skipped)
    }
}

/// Fate of a finished item, as decided by [`JobDriver::collect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The item is finished.
    Done,
    /// Run the item again in the same slot, ahead of the rest of its chain.
    Requeue,
    /// Stop dispatching new work and shut the pool down.
    TooManyErrors,
}

/// Caller-side half of the engine: starts items and judges their results.
///
/// `spawn` and `collect` are always called from the scheduling loop, one at
/// a time.
pub trait JobDriver {
    type Item;
    type Handle: JobHandle;

    /// Start `item` as an external operation.
    fn spawn(&mut self, item: &Self::Item, info: JobInfo) -> Result<Spawned<Self::Handle>>;

    /// Inspect a finished (or skipped) item.
    ///
    /// `info` is `None` for items that were never dispatched because the run
    /// was aborted. Returning `Err` stops the scheduler with that error.
    fn collect(
        &mut self,
        item: &Self::Item,
        handle: Spawned<Self::Handle>,
        info: Option<JobInfo>,
    ) -> Result<Outcome>;
}
