//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the vehicle: actuation
//! demands sent to it and telemetry recieved from it.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod actuation;
pub mod telemetry;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use actuation::*;
pub use telemetry::*;
