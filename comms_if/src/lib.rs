//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (actuation demands and vehicle telemetry)
pub mod eqpt;

/// Network module
pub mod net;
