//! General time utility functions
//!
//! Provides the clocks used to pace cyclic processing and a fixed-rate timer
//! which schedules cycle boundaries without accumulating drift.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use log::warn;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time which can also suspend the caller.
///
/// Times are expressed in seconds relative to an arbitrary origin chosen by
/// the clock.
pub trait Clock {
    /// Current time in seconds.
    fn now_s(&self) -> f64;

    /// Suspend until the clock reads at least `deadline_s`.
    ///
    /// Returns immediately if the deadline has already passed.
    fn sleep_until_s(&mut self, deadline_s: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

/// A virtual clock which only moves when asked to sleep.
///
/// Sleeping jumps the clock straight to the deadline, which makes cyclic
/// processing deterministic and instantaneous. Used for simulation and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteppedClock {
    now_s: f64,
}

/// Fixed-rate cycle timer.
///
/// Deadlines are computed as `start + k * period` rather than by sleeping for
/// a constant duration, so time spent processing within a cycle does not
/// shift the following cycles.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateTimer {
    period_s: f64,
    next_deadline_s: f64,
}

/// Result of waiting for a cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleWait {
    /// The boundary was reached on time.
    OnTime,

    /// The cycle overran its boundary by the given number of seconds. The
    /// timer has been re-phased to start a full period from now.
    Overrun(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_s(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep_until_s(&mut self, deadline_s: f64) {
        let remaining_s = deadline_s - self.now_s();

        if remaining_s > 0.0 {
            thread::sleep(Duration::from_secs_f64(remaining_s));
        }
    }
}

impl SteppedClock {
    /// Create a new clock reading `start_s`.
    pub fn new(start_s: f64) -> Self {
        Self { now_s: start_s }
    }

    /// Move the clock forward without sleeping, for instance to model
    /// processing time.
    pub fn advance(&mut self, dt_s: f64) {
        self.now_s += dt_s;
    }
}

impl Clock for SteppedClock {
    fn now_s(&self) -> f64 {
        self.now_s
    }

    fn sleep_until_s(&mut self, deadline_s: f64) {
        if deadline_s > self.now_s {
            self.now_s = deadline_s;
        }
    }
}

impl FixedRateTimer {
    /// Create a new timer whose first boundary is one period after `start_s`.
    pub fn new(period_s: f64, start_s: f64) -> Self {
        Self {
            period_s,
            next_deadline_s: start_s + period_s,
        }
    }

    /// The period of the timer in seconds.
    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    /// The time of the next cycle boundary.
    pub fn next_deadline_s(&self) -> f64 {
        self.next_deadline_s
    }

    /// Sleep until the next cycle boundary and schedule the following one.
    pub fn wait<C: Clock>(&mut self, clock: &mut C) -> CycleWait {
        let now_s = clock.now_s();

        if now_s > self.next_deadline_s {
            let overrun_s = now_s - self.next_deadline_s;
            warn!("Cycle overran by {:.06} s", overrun_s);

            self.next_deadline_s = now_s + self.period_s;
            return CycleWait::Overrun(overrun_s);
        }

        clock.sleep_until_s(self.next_deadline_s);
        self.next_deadline_s += self.period_s;

        CycleWait::OnTime
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
