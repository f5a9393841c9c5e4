// src/engine/breaker.rs

//! Consecutive-failure circuit breaker for use inside a driver's `collect`.
//!
//! The scheduler itself holds no failure policy; it only reacts to
//! [`Outcome::TooManyErrors`](crate::engine::Outcome::TooManyErrors). This
//! helper is the usual way to produce that outcome.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    /// Neither counts as a failure nor resets the streak.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct FailureBreaker {
    /// Trip threshold; `0` disables the breaker.
    max_consecutive: u32,
    consecutive: u32,
}

impl FailureBreaker {
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            max_consecutive,
            consecutive: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    /// Record one result and return `true` if the breaker is now tripped.
    pub fn record(&mut self, verdict: Verdict) -> bool {
        match verdict {
            Verdict::Passed => self.consecutive = 0,
            Verdict::Failed => self.consecutive += 1,
            Verdict::Ignored => {}
        }

        let tripped = self.max_consecutive > 0 && self.consecutive >= self.max_consecutive;
        if tripped {
            debug!(
                consecutive = self.consecutive,
                max = self.max_consecutive,
                "failure breaker tripped"
            );
        }
        tripped
    }
}
