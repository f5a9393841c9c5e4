#![allow(dead_code)]

use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;

use anyhow::anyhow;

use jobloop::engine::{JobDriver, JobHandle, Outcome, Spawned};
use jobloop::errors::Result;
use jobloop::types::JobInfo;

/// Everything the scheduler asked the driver to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent<T> {
    Spawn { item: T, info: JobInfo },
    /// `resolved` is set when the handle was [`Spawned::Skipped`]; `info` is
    /// `None` for items skipped by an abort.
    Collect {
        item: T,
        resolved: bool,
        info: Option<JobInfo>,
    },
}

/// Handle that reports "still running" for a fixed number of polls.
#[derive(Debug)]
pub struct FakeHandle {
    busy_polls: u32,
}

impl JobHandle for FakeHandle {
    fn poll(&mut self) -> Result<bool> {
        if self.busy_polls == 0 {
            return Ok(true);
        }
        self.busy_polls -= 1;
        Ok(false)
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.busy_polls = 0;
            Ok(())
        })
    }
}

type SpawnHook<T> = Box<dyn FnMut(&T, usize)>;

/// Scriptable [`JobDriver`] that never starts a real process.
///
/// - every call is recorded as a [`DriverEvent`]
/// - `busy_polls` makes each handle report busy that many times
/// - `resolve_on_spawn` returns [`Spawned::Skipped`] from every spawn
/// - `requeue_once` items are requeued the first time they finish
/// - `trip_on_collect(n)` returns [`Outcome::TooManyErrors`] on the n-th collect
/// - `on_spawn` runs after the n-th spawn (1-based), e.g. to drop an abort file
pub struct FakeDriver<T> {
    events: Vec<DriverEvent<T>>,
    busy_polls: u32,
    resolve_on_spawn: bool,
    requeue_once: HashSet<T>,
    trip_on_collect: Option<usize>,
    fail_on_collect: Option<T>,
    on_spawn: Option<SpawnHook<T>>,
    spawns: usize,
    collects: usize,
    in_flight: usize,
    max_in_flight: usize,
}

impl<T: Clone + Eq + Hash + Debug> FakeDriver<T> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            busy_polls: 0,
            resolve_on_spawn: false,
            requeue_once: HashSet::new(),
            trip_on_collect: None,
            fail_on_collect: None,
            on_spawn: None,
            spawns: 0,
            collects: 0,
            in_flight: 0,
            max_in_flight: 0,
        }
    }

    pub fn busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    pub fn resolve_on_spawn(mut self) -> Self {
        self.resolve_on_spawn = true;
        self
    }

    pub fn requeue_once(mut self, item: T) -> Self {
        self.requeue_once.insert(item);
        self
    }

    pub fn trip_on_collect(mut self, n: usize) -> Self {
        self.trip_on_collect = Some(n);
        self
    }

    pub fn fail_on_collect(mut self, item: T) -> Self {
        self.fail_on_collect = Some(item);
        self
    }

    pub fn on_spawn(mut self, hook: impl FnMut(&T, usize) + 'static) -> Self {
        self.on_spawn = Some(Box::new(hook));
        self
    }

    pub fn events(&self) -> &[DriverEvent<T>] {
        &self.events
    }

    /// Items in spawn order, retries included.
    pub fn spawned(&self) -> Vec<T> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DriverEvent::Spawn { item, .. } => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    /// Items collected after being dispatched, in collect order.
    pub fn collected(&self) -> Vec<T> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DriverEvent::Collect {
                    item,
                    info: Some(_),
                    ..
                } => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    /// Items collected with the abort skip marker.
    pub fn skipped(&self) -> Vec<T> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DriverEvent::Collect {
                    item, info: None, ..
                } => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    /// Highest number of items spawned but not yet collected at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

impl<T: Clone + Eq + Hash + Debug> Default for FakeDriver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash + Debug> JobDriver for FakeDriver<T> {
    type Item = T;
    type Handle = FakeHandle;

    fn spawn(&mut self, item: &T, info: JobInfo) -> Result<Spawned<FakeHandle>> {
        self.spawns += 1;
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
        self.events.push(DriverEvent::Spawn {
            item: item.clone(),
            info,
        });

        if let Some(hook) = self.on_spawn.as_mut() {
            hook(item, self.spawns);
        }

        if self.resolve_on_spawn {
            Ok(Spawned::Skipped)
        } else {
            Ok(Spawned::Running(FakeHandle {
                busy_polls: self.busy_polls,
            }))
        }
    }

    fn collect(
        &mut self,
        item: &T,
        handle: Spawned<FakeHandle>,
        info: Option<JobInfo>,
    ) -> Result<Outcome> {
        self.collects += 1;
        if info.is_some() {
            self.in_flight -= 1;
        }
        self.events.push(DriverEvent::Collect {
            item: item.clone(),
            resolved: handle.is_skipped(),
            info,
        });

        if self.fail_on_collect.as_ref() == Some(item) {
            return Err(anyhow!("collect failed for {:?}", item).into());
        }
        if self.trip_on_collect == Some(self.collects) {
            return Ok(Outcome::TooManyErrors);
        }
        if info.is_some() && self.requeue_once.remove(item) {
            return Ok(Outcome::Requeue);
        }
        Ok(Outcome::Done)
    }
}
