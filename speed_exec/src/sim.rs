//! # Simulated vehicle
//!
//! A first order longitudinal model of the vehicle, used for dry runs of the speed controller
//! without any hardware or network present. The command is treated as a demanded acceleration
//! opposed by a linear drag:
//!
//! ```text
//! speed += (accel_per_command * command - drag * speed) * dt
//! ```
//!
//! The vehicle cannot reverse, speed is floored at zero.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

use log::trace;
use serde::Deserialize;

use crate::{
    actuation::{ActuationError, ActuationSink},
    feedback::FeedbackSource,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated vehicle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Acceleration produced by a full (1.0) command.
    ///
    /// Units: meters/second^2
    pub accel_per_command_mss: f64,

    /// Linear drag coefficient.
    ///
    /// Units: 1/second
    pub drag_per_s: f64,

    /// Speed of the vehicle at the start of the run.
    ///
    /// Units: meters/second
    pub initial_speed_ms: f64,
}

/// The simulated vehicle state.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    params: SimParams,

    /// Integration step, one control period
    dt_s: f64,

    speed_ms: f64,

    command: f64,
}

/// Shared handle to a simulated vehicle.
///
/// The control loop needs the vehicle as both its feedback source and its actuation sink, so
/// clones of one handle are given to each. The loop is single threaded so no locking is needed.
#[derive(Debug, Clone)]
pub struct SimHandle(Rc<RefCell<SimVehicle>>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            accel_per_command_mss: 3.0,
            drag_per_s: 0.05,
            initial_speed_ms: 0.0,
        }
    }
}

impl SimVehicle {
    /// Create a new vehicle stepped by `dt_s` on each read.
    pub fn new(params: SimParams, dt_s: f64) -> Self {
        Self {
            speed_ms: params.initial_speed_ms.max(0.0),
            command: 0.0,
            params,
            dt_s,
        }
    }

    /// Advance the model by one step using the last command.
    pub fn step(&mut self) {
        let accel_mss = self.params.accel_per_command_mss * self.command
            - self.params.drag_per_s * self.speed_ms;

        self.speed_ms = (self.speed_ms + accel_mss * self.dt_s).max(0.0);

        trace!(
            "Sim: command = {:.04}, speed = {:.04} m/s",
            self.command,
            self.speed_ms
        );
    }

    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    pub fn command(&self) -> f64 {
        self.command
    }

    /// Wrap the vehicle in a shareable handle.
    pub fn into_handle(self) -> SimHandle {
        SimHandle(Rc::new(RefCell::new(self)))
    }
}

impl SimHandle {
    pub fn speed_ms(&self) -> f64 {
        self.0.borrow().speed_ms()
    }

    pub fn command(&self) -> f64 {
        self.0.borrow().command()
    }
}

impl FeedbackSource for SimHandle {
    fn read(&mut self) -> Option<f64> {
        let mut vehicle = self.0.borrow_mut();
        vehicle.step();
        Some(vehicle.speed_ms)
    }
}

impl ActuationSink for SimHandle {
    fn send(&mut self, command: f64, _aux: &[f64]) -> Result<(), ActuationError> {
        self.0.borrow_mut().command = command;
        Ok(())
    }
}
