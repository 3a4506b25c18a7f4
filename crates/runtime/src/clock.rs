//! Monotonic frame clock
//!
//! Elapsed-time and delta-time source driving the scheduler and the morph
//! machine. Backed by [`std::time::Instant`], so it never rewinds; by
//! convention the first tick reports a zero delta.

use std::time::Instant;

use crate::types::Dt;

/// One clock reading
#[derive(Debug, Clone, Copy)]
pub struct TickTimes {
    /// Seconds since the clock started
    pub elapsed: f64,
    /// Seconds since the previous tick (zero on the first)
    pub delta: Dt,
}

/// Monotonic elapsed/delta time source
#[derive(Debug)]
pub struct Clock {
    start: Instant,
    last: Option<Instant>,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            last: None,
        }
    }

    pub fn tick(&mut self) -> TickTimes {
        let now = Instant::now();
        let elapsed = now.duration_since(self.start).as_secs_f64();
        let delta = match self.last {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        self.last = Some(now);
        TickTimes {
            elapsed,
            delta: Dt(delta),
        }
    }
}
