// src/engine/poll.rs

//! Delay between poll sweeps.
//!
//! Polling too often burns CPU while every slot is busy; polling too rarely
//! leaves finished slots idle. When adaptive, the interval grows by 25% after
//! a wait that needed many sweeps and shrinks by 25% otherwise.

use std::time::Duration;

use tracing::debug;

/// Interval used when adaptive polling is disabled, and the starting point
/// when it is enabled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A wait needing more sweeps than this counts as "polling too much".
const BUSY_SWEEPS: u32 = 8;
const MAX_INTERVAL: Duration = Duration::from_secs(1);
const MIN_INTERVAL: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy)]
pub struct PollInterval {
    current: Duration,
    adaptive: bool,
}

impl PollInterval {
    pub fn new(initial: Duration, adaptive: bool) -> Self {
        Self {
            current: initial,
            adaptive,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Update the interval from the number of sweeps the last wait needed.
    pub fn adjust(&mut self, sweeps: u32) {
        if !self.adaptive {
            return;
        }

        if sweeps > BUSY_SWEEPS && self.current < MAX_INTERVAL {
            self.current = self.current.mul_f64(1.25);
            debug!(interval = ?self.current, "increased poll interval");
        } else if self.current > MIN_INTERVAL {
            self.current = self.current.mul_f64(0.75);
            debug!(interval = ?self.current, "decreased poll interval");
        }
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, true)
    }
}
