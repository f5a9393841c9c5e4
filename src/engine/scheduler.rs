// src/engine/scheduler.rs

//! Pool driver: fills idle slots from the graph, polls busy ones, and owns
//! every shutdown path.
//!
//! The loop is a single cooperative task. All parallelism lives in whatever
//! the driver's `spawn` starts; the loop itself only suspends while sleeping
//! between poll sweeps and while waiting on running slots during an abort.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::dag::{validate_graph, DependencyGraph, Next, WorkItem};
use crate::engine::poll::{PollInterval, DEFAULT_POLL_INTERVAL};
use crate::engine::slot::{SlotPoll, WorkerSlot};
use crate::engine::{JobDriver, Outcome, Spawned};
use crate::errors::{JobloopError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::NodeId;

/// Tunables for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Number of worker slots; `0` means one per available CPU.
    pub jobs: usize,
    /// Stop dispatching as soon as this file exists.
    pub abort_file: Option<PathBuf>,
    /// Adapt the poll interval to how busy the pool is.
    pub dynamic_poll_interval: bool,
    /// Starting poll interval.
    pub poll_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            abort_file: None,
            dynamic_poll_interval: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every node was dispatched and collected.
    Completed,
    /// The abort file appeared.
    AbortFile,
    /// The driver reported [`Outcome::TooManyErrors`].
    TooManyErrors,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub stop: StopReason,
    /// Items handed to `spawn`, retries included.
    pub dispatched: usize,
    /// Items the driver asked to run again.
    pub requeued: usize,
    /// Items collected with the skip marker because the run was cut short.
    pub skipped: usize,
}

/// How the fill/poll loop was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Exhausted,
    AbortFile,
    TooManyErrors,
    Interrupted,
}

/// Result of stepping a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStep {
    Empty,
    Busy,
    Freed,
    TooManyErrors,
}

pub struct Scheduler<D: JobDriver, F: FileSystem = RealFileSystem> {
    graph: DependencyGraph<D::Item>,
    driver: D,
    fs: F,
    workers: usize,
    abort_file: Option<PathBuf>,
    slots: Vec<Option<WorkerSlot<D::Item, D::Handle>>>,
    /// Node currently locked by each slot.
    locked_items: Vec<Option<NodeId>>,
    active_workers: usize,
    poll: PollInterval,
    interrupt: Option<mpsc::Receiver<()>>,
    dispatched: usize,
    requeued: usize,
    skipped: usize,
}

impl<D: JobDriver, F: FileSystem> fmt::Debug for Scheduler<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.workers)
            .field("active_workers", &self.active_workers)
            .field("locked_items", &self.locked_items)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl<D: JobDriver> Scheduler<D, RealFileSystem> {
    /// Build a scheduler over `graph`, checking that the graph can be fully
    /// drained.
    pub fn new(graph: DependencyGraph<D::Item>, driver: D, options: SchedulerOptions) -> Result<Self> {
        Self::with_fs(graph, driver, options, RealFileSystem)
    }

    /// Build a scheduler over a flat list of independent items.
    pub fn from_items(
        items: impl IntoIterator<Item = D::Item>,
        driver: D,
        options: SchedulerOptions,
    ) -> Result<Self> {
        Self::new(DependencyGraph::from_items(items), driver, options)
    }
}

impl<D: JobDriver, F: FileSystem> Scheduler<D, F> {
    /// Like [`Scheduler::new`], but checks the abort file through `fs`.
    pub fn with_fs(
        graph: DependencyGraph<D::Item>,
        driver: D,
        options: SchedulerOptions,
        fs: F,
    ) -> Result<Self> {
        validate_graph(&graph)?;

        let workers = resolve_workers(options.jobs);
        Ok(Self {
            graph,
            driver,
            fs,
            workers,
            abort_file: options.abort_file,
            slots: (0..workers).map(|_| None).collect(),
            locked_items: vec![None; workers],
            active_workers: 0,
            poll: PollInterval::new(options.poll_interval, options.dynamic_poll_interval),
            interrupt: None,
            dispatched: 0,
            requeued: 0,
            skipped: 0,
        })
    }

    /// A message on `rx` is handled as a user interrupt: drain, abort, then
    /// return [`JobloopError::Interrupted`].
    pub fn with_interrupt(mut self, rx: mpsc::Receiver<()>) -> Self {
        self.interrupt = Some(rx);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn graph(&self) -> &DependencyGraph<D::Item> {
        &self.graph
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Drain the graph.
    ///
    /// Returns `Ok` when the graph was exhausted, when the abort file
    /// appeared, and when the driver asked to stop because of too many
    /// errors. Returns [`JobloopError::Interrupted`] after draining and
    /// aborting on a user interrupt, and any error raised by the driver.
    pub async fn run(&mut self) -> Result<RunReport> {
        info!(
            workers = self.workers,
            abort_file = ?self.abort_file,
            nodes = self.graph.len(),
            "starting main loop"
        );

        let stop = match self.fill_and_poll().await? {
            LoopExit::Exhausted => {
                if self.drain(true).await? {
                    error!("user interrupt");
                    self.abort(false).await?;
                    return Err(JobloopError::Interrupted);
                }
                StopReason::Completed
            }
            LoopExit::AbortFile => {
                info!(abort_file = ?self.abort_file, "aborting: abort file found");
                self.abort(true).await?;
                StopReason::AbortFile
            }
            LoopExit::TooManyErrors => {
                error!("too many errors, aborting");
                let interrupted = self.drain(false).await?;
                self.abort(false).await?;
                if interrupted {
                    return Err(JobloopError::Interrupted);
                }
                StopReason::TooManyErrors
            }
            LoopExit::Interrupted => {
                error!("user interrupt");
                // Already stopping; a second interrupt changes nothing.
                self.drain(false).await?;
                self.abort(false).await?;
                return Err(JobloopError::Interrupted);
            }
        };

        let report = RunReport {
            stop,
            dispatched: self.dispatched,
            requeued: self.requeued,
            skipped: self.skipped,
        };
        info!(?report, "main loop finished");
        Ok(report)
    }

    async fn fill_and_poll(&mut self) -> Result<LoopExit> {
        let mut no_free_item = false;

        loop {
            if self.abort_requested() {
                return Ok(LoopExit::AbortFile);
            }
            if self.interrupted() {
                return Ok(LoopExit::Interrupted);
            }

            for slot in 0..self.workers {
                if self.slots[slot].is_some() {
                    continue;
                }
                match self.graph.next() {
                    Next::Exhausted => return Ok(LoopExit::Exhausted),
                    Next::Blocked => {
                        no_free_item = true;
                        break;
                    }
                    Next::Ready(id, payload) => self.start_slot(slot, id, payload)?,
                }
            }

            let mut sweeps = 0;
            while self.active_workers >= self.workers || no_free_item {
                sweeps += 1;
                if self.interrupted() {
                    return Ok(LoopExit::Interrupted);
                }

                for slot in 0..self.workers {
                    match self.step_slot(slot, true)? {
                        SlotStep::Freed => no_free_item = false,
                        SlotStep::TooManyErrors => return Ok(LoopExit::TooManyErrors),
                        SlotStep::Empty | SlotStep::Busy => {}
                    }
                }

                tokio::time::sleep(self.poll.current()).await;
            }

            self.poll.adjust(sweeps);
        }
    }

    fn start_slot(&mut self, slot: usize, id: NodeId, payload: WorkItem<D::Item>) -> Result<()> {
        debug!(slot, node = %id, items = payload.len(), "assigning node to slot");

        self.locked_items[slot] = Some(id);
        self.active_workers += 1;

        let mut worker = WorkerSlot::new(slot, payload);
        let started = worker.dispatch_next(&mut self.driver);
        self.slots[slot] = Some(worker);
        if started? {
            self.dispatched += 1;
        }
        Ok(())
    }

    /// Poll one slot. When its current item is done, either dispatch the next
    /// chain item (`continue_chain`) or free the slot and release its node.
    fn step_slot(&mut self, slot: usize, continue_chain: bool) -> Result<SlotStep> {
        let Some(worker) = self.slots[slot].as_mut() else {
            return Ok(SlotStep::Empty);
        };

        let retries_before = worker.retry_count();
        let polled = worker.poll(&mut self.driver)?;
        if worker.retry_count() > retries_before {
            self.requeued += 1;
        }

        match polled {
            SlotPoll::Busy => Ok(SlotStep::Busy),
            SlotPoll::TooManyErrors => Ok(SlotStep::TooManyErrors),
            SlotPoll::Free => {
                if continue_chain && worker.dispatch_next(&mut self.driver)? {
                    self.dispatched += 1;
                    return Ok(SlotStep::Busy);
                }
                self.free_slot(slot)?;
                Ok(SlotStep::Freed)
            }
        }
    }

    /// Empty a slot and release its node. Chain items it never dispatched
    /// are collected as skipped.
    fn free_slot(&mut self, slot: usize) -> Result<()> {
        let Some(mut worker) = self.slots[slot].take() else {
            return Ok(());
        };
        self.active_workers -= 1;

        for item in worker.take_remaining() {
            self.skip(&item)?;
        }

        if let Some(id) = self.locked_items[slot].take() {
            self.graph.release(id);
        }
        Ok(())
    }

    /// Poll occupied slots until none is left, without taking new nodes from
    /// the graph.
    ///
    /// With `continue_chain`, remaining chain items still run; a
    /// too-many-errors outcome or a user interrupt turns that off for the rest
    /// of the drain. Neither stops the drain itself, since nothing new is
    /// being started.
    ///
    /// Returns `true` if a user interrupt arrived while draining.
    async fn drain(&mut self, mut continue_chain: bool) -> Result<bool> {
        debug!(active = self.active_workers, continue_chain, "draining worker slots");
        let mut interrupted = false;

        while self.active_workers > 0 {
            if !interrupted && self.interrupted() {
                warn!("user interrupt while draining; remaining chain items will be skipped");
                interrupted = true;
                continue_chain = false;
            }

            for slot in 0..self.workers {
                if self.step_slot(slot, continue_chain)? == SlotStep::TooManyErrors && continue_chain {
                    warn!("too many errors while draining; remaining chain items will be skipped");
                    continue_chain = false;
                }
            }

            if self.active_workers > 0 {
                tokio::time::sleep(self.poll.current()).await;
            }
        }
        Ok(interrupted)
    }

    /// Release every locked node, optionally wait for running slots, then
    /// collect everything the graph still holds as skipped.
    async fn abort(&mut self, wait_running: bool) -> Result<()> {
        for id in self.locked_items.iter().flatten() {
            self.graph.release(*id);
        }

        if wait_running {
            for slot in 0..self.workers {
                if let Some(worker) = self.slots[slot].as_mut() {
                    if worker.wait(&mut self.driver).await? == SlotPoll::TooManyErrors {
                        debug!(slot, "ignoring too-many-errors while aborting");
                    }
                }
                self.free_slot(slot)?;
            }
        }

        loop {
            match self.graph.next() {
                Next::Ready(id, payload) => {
                    self.graph.release(id);
                    for item in payload.into_items() {
                        self.skip(&item)?;
                    }
                }
                Next::Blocked => {
                    warn!(
                        pending = self.graph.pending_count(),
                        "nodes still blocked after abort; they will not be reported"
                    );
                    break;
                }
                Next::Exhausted => break,
            }
        }
        Ok(())
    }

    fn skip(&mut self, item: &D::Item) -> Result<()> {
        self.skipped += 1;
        if self.driver.collect(item, Spawned::Skipped, None)? == Outcome::Requeue {
            debug!("ignoring requeue for a skipped item");
        }
        Ok(())
    }

    fn abort_requested(&self) -> bool {
        self.abort_file
            .as_deref()
            .is_some_and(|path| self.fs.is_file(path))
    }

    fn interrupted(&mut self) -> bool {
        match self.interrupt.as_mut() {
            Some(rx) => match rx.try_recv() {
                Ok(()) => true,
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => {
                    self.interrupt = None;
                    false
                }
            },
            None => false,
        }
    }
}

fn resolve_workers(jobs: usize) -> usize {
    if jobs == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        jobs
    }
}
