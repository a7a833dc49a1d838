//! # Speed control module
//!
//! Speed control converts the recent history of the vehicle (time, measured speed and the
//! previous command) plus the target speed one cycle ahead into a new gas/brake command.
//!
//! The command is a single value in [-1, 1], positive to accelerate and negative to brake. The
//! law used to compute it is selected by the parameters and sits behind the [`ControlLaw`] trait,
//! so that alternative laws can be swapped in without touching the control loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod law;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use law::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Inputs to a control law for a single cycle.
///
/// Speeds are all in the same unit (meters/second). Times are profile-relative seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LawInput {
    /// Command sent on the previous cycle (`g0`).
    pub prev_command: f64,

    /// Time of the previous cycle (`t0`).
    pub prev_time_s: f64,

    /// Measured speed on the previous cycle (`Vr0`).
    pub prev_speed_ms: f64,

    /// Time of this cycle (`t1`).
    pub curr_time_s: f64,

    /// Measured speed on this cycle (`Vr1`).
    pub curr_speed_ms: f64,

    /// Target speed one period after this cycle (`Vt2`).
    pub next_target_speed_ms: f64,

    /// Control period.
    pub period_s: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A law producing the next gas/brake command.
///
/// Implementations must be pure: the same input always gives the same command. Results shall be
/// saturated to the law's command bounds. A law may only return a non-finite value if its inputs
/// were non-finite, it is up to the caller to catch this.
pub trait ControlLaw {
    /// Short name of the law, used in logs.
    fn name(&self) -> &'static str;

    /// Compute the command for this cycle.
    fn next_command(&self, input: &LawInput) -> f64;
}
