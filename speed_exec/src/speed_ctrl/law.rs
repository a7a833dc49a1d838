//! Control law implementations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

use super::{ControlLaw, LawInput};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gain estimation law.
///
/// Estimates how much command produced how much speed change over the previous cycle and scales
/// the previous command to achieve the speed change needed to reach the next target:
///
/// ```text
/// g1 = g0 * (t1 - t0) * (Vt2 - Vr1) / (Vr1 - Vr0) / period
/// ```
///
/// Two degenerate cases are guarded:
/// - If the vehicle is already at the next target the command is zero (hold).
/// - If the measured speed did not change there is no response to estimate from, and the
///   default command is used instead.
///
/// The result is saturated to the command bounds after it is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEstimationLaw {
    pub default_command: f64,
    pub min_command: f64,
    pub max_command: f64,
}

/// Proportional law on the speed error one cycle ahead.
///
/// ```text
/// g1 = k_p * (Vt2 - Vr1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalLaw {
    pub k_p: f64,
    pub min_command: f64,
    pub max_command: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlLaw for GainEstimationLaw {
    fn name(&self) -> &'static str {
        "gain_estimation"
    }

    fn next_command(&self, input: &LawInput) -> f64 {
        let g0 = input.prev_command;
        let t0 = input.prev_time_s;
        let t1 = input.curr_time_s;
        let vr0 = input.prev_speed_ms;
        let vr1 = input.curr_speed_ms;
        let vt2 = input.next_target_speed_ms;

        #[allow(clippy::float_cmp)]
        let g1 = if vt2 == vr1 {
            0.0
        } else if vr1 == vr0 {
            self.default_command
        } else {
            g0 * (t1 - t0) * (vt2 - vr1) / (vr1 - vr0) / input.period_s
        };

        clamp(g1, self.min_command, self.max_command)
    }
}

impl ControlLaw for ProportionalLaw {
    fn name(&self) -> &'static str {
        "proportional"
    }

    fn next_command(&self, input: &LawInput) -> f64 {
        let error_ms = input.next_target_speed_ms - input.curr_speed_ms;

        clamp(self.k_p * error_ms, self.min_command, self.max_command)
    }
}
