//! Carried state of the speed controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::LawInput;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Memory carried from one cycle to the next.
///
/// Exactly one writer, the control loop, owns a state. Each tracking session has its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlState {
    /// Profile time of the previous cycle (`t0`).
    pub previous_time_s: f64,

    /// Measured speed on the previous cycle (`Vr0`).
    pub previous_measured_speed_ms: f64,

    /// Command of the previous cycle (`g0`), never exactly zero.
    pub previous_command: f64,

    /// Profile time of the current cycle (`t1`).
    pub current_time_s: f64,

    #[serde(skip)]
    default_command: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlState {
    /// Create the state for the start of a run.
    pub fn new(default_command: f64) -> Self {
        Self {
            previous_time_s: 0.0,
            previous_measured_speed_ms: 0.0,
            previous_command: default_command,
            current_time_s: 0.0,
            default_command,
        }
    }

    /// Build the law input for the current cycle.
    pub fn law_input(&self, curr_speed_ms: f64, next_target_speed_ms: f64, period_s: f64) -> LawInput {
        LawInput {
            prev_command: self.previous_command,
            prev_time_s: self.previous_time_s,
            prev_speed_ms: self.previous_measured_speed_ms,
            curr_time_s: self.current_time_s,
            curr_speed_ms,
            next_target_speed_ms,
            period_s,
        }
    }

    /// Roll the current cycle into the previous one.
    ///
    /// A zero command is replaced by the default so that the next gain estimate cannot collapse
    /// to zero and stay there.
    pub fn advance(&mut self, curr_speed_ms: f64, command: f64, next_time_s: f64) {
        self.previous_time_s = self.current_time_s;
        self.previous_measured_speed_ms = curr_speed_ms;
        self.previous_command = if command == 0.0 {
            self.default_command
        } else {
            command
        };
        self.current_time_s = next_time_s;
    }

    pub fn default_command(&self) -> f64 {
        self.default_command
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_initial_state() {
        let s = ControlState::new(0.1);

        assert_eq!(s.previous_time_s, 0.0);
        assert_eq!(s.previous_measured_speed_ms, 0.0);
        assert_eq!(s.previous_command, 0.1);
        assert_eq!(s.current_time_s, 0.0);
    }

    #[test]
    fn test_advance_rolls_and_coerces_zero() {
        let mut s = ControlState::new(0.1);

        s.advance(1.5, 0.4, 0.02);
        assert_eq!(s.previous_time_s, 0.0);
        assert_eq!(s.previous_measured_speed_ms, 1.5);
        assert_eq!(s.previous_command, 0.4);
        assert_eq!(s.current_time_s, 0.02);

        s.advance(1.7, 0.0, 0.04);
        assert_eq!(s.previous_time_s, 0.02);
        assert_eq!(s.previous_command, 0.1);

        s.advance(1.7, -0.3, 0.06);
        assert_eq!(s.previous_command, -0.3);

        let input = s.law_input(2.0, 3.0, 0.02);
        assert_eq!(input.prev_time_s, 0.04);
        assert_eq!(input.curr_time_s, 0.06);
        assert_eq!(input.prev_speed_ms, 1.7);
        assert_eq!(input.curr_speed_ms, 2.0);
        assert_eq!(input.next_target_speed_ms, 3.0);
    }
}
