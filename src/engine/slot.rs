// src/engine/slot.rs

//! One pool slot driving a locked node's payload to completion.
//!
//! Per-slot state machine:
//!
//! ```text
//! EMPTY -> DISPATCHED -> (busy, polled) -> FINALIZING -> EMPTY | DISPATCHED (requeued)
//! ```

use tracing::{debug, warn};

use crate::dag::WorkItem;
use crate::engine::{JobDriver, JobHandle, Outcome, Spawned};
use crate::errors::Result;
use crate::types::JobInfo;

/// Result of polling a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPoll {
    /// The current operation is still running.
    Busy,
    /// Nothing in flight; the slot may dispatch the next chain item.
    Free,
    /// The driver's collect asked for the whole pool to stop.
    TooManyErrors,
}

#[derive(Debug)]
struct Current<T, H> {
    item: T,
    handle: Spawned<H>,
}

#[derive(Debug)]
pub struct WorkerSlot<T, H> {
    index: usize,
    /// Remaining chain items, reversed so the next one pops from the end.
    pending: Vec<T>,
    retry_count: u32,
    current: Option<Current<T, H>>,
}

impl<T, H> WorkerSlot<T, H> {
    /// Bind a locked node's payload to slot `index`. Nothing is dispatched
    /// until [`dispatch_next`](Self::dispatch_next) is called.
    pub fn new(index: usize, payload: WorkItem<T>) -> Self {
        let mut pending = payload.into_items();
        pending.reverse();

        Self {
            index,
            pending,
            retry_count: 0,
            current: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether an item is currently dispatched and not yet collected.
    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// Number of chain items not dispatched yet.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Remove the chain items that were never dispatched, in chain order.
    pub fn take_remaining(&mut self) -> Vec<T> {
        let mut items = std::mem::take(&mut self.pending);
        items.reverse();
        items
    }

    fn job_info(&self) -> JobInfo {
        JobInfo {
            slot: self.index,
            retry_count: self.retry_count,
        }
    }
}

impl<T, H: JobHandle> WorkerSlot<T, H> {
    /// Start the next chain item. Returns `false` when the chain is exhausted.
    pub fn dispatch_next<D>(&mut self, driver: &mut D) -> Result<bool>
    where
        D: JobDriver<Item = T, Handle = H>,
    {
        let Some(item) = self.pending.pop() else {
            return Ok(false);
        };

        let info = self.job_info();
        let handle = driver.spawn(&item, info)?;
        debug!(
            slot = self.index,
            retry_count = self.retry_count,
            resolved = handle.is_skipped(),
            "dispatched item"
        );

        self.current = Some(Current { item, handle });
        Ok(true)
    }

    /// Check the in-flight operation, collecting it when it has finished.
    pub fn poll<D>(&mut self, driver: &mut D) -> Result<SlotPoll>
    where
        D: JobDriver<Item = T, Handle = H>,
    {
        let Some(current) = self.current.as_mut() else {
            return Ok(SlotPoll::Free);
        };

        if let Spawned::Running(handle) = &mut current.handle {
            if !handle.poll()? {
                return Ok(SlotPoll::Busy);
            }
        }

        self.finalize(driver)
    }

    /// Block on the in-flight operation, then collect it.
    pub async fn wait<D>(&mut self, driver: &mut D) -> Result<SlotPoll>
    where
        D: JobDriver<Item = T, Handle = H>,
    {
        let Some(current) = self.current.as_mut() else {
            return Ok(SlotPoll::Free);
        };

        if let Spawned::Running(handle) = &mut current.handle {
            handle.wait().await?;
        }

        self.finalize(driver)
    }

    fn finalize<D>(&mut self, driver: &mut D) -> Result<SlotPoll>
    where
        D: JobDriver<Item = T, Handle = H>,
    {
        let Some(Current { item, handle }) = self.current.take() else {
            return Ok(SlotPoll::Free);
        };

        match driver.collect(&item, handle, Some(self.job_info()))? {
            Outcome::Done => Ok(SlotPoll::Free),
            Outcome::Requeue => {
                self.retry_count += 1;
                warn!(
                    slot = self.index,
                    retry_count = self.retry_count,
                    "item requeued"
                );
                self.pending.push(item);
                Ok(SlotPoll::Free)
            }
            Outcome::TooManyErrors => Ok(SlotPoll::TooManyErrors),
        }
    }
}
