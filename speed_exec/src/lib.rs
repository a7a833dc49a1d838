//! # Speed library.
//!
//! This library holds the speed tracking controller and the clients it uses to talk to the
//! vehicle, so that they can be used by the executable, the benchmarks and other crates in the
//! workspace.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuation sinks - send gas/brake commands to the vehicle
pub mod actuation;

/// Control loop - runs the speed controller on a fixed period
pub mod ctrl_loop;

/// Feedback sources - provide the measured speed of the vehicle
pub mod feedback;

/// Executable parameters
pub mod params;

/// Precondition check - the vehicle must be offroad before it is commanded
pub mod precondition;

/// Speed profile - the target speed against time
pub mod profile;

/// Simulated vehicle for dry runs
pub mod sim;

/// Speed control - the laws converting speed error into a command
pub mod speed_ctrl;
