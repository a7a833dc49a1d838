//! # Vehicle Telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Speed telemetry published by the vehicle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedTelemetry {
    /// Measured ground speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Time at which the speed was measured.
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpeedTelemetry {
    /// Age of this sample relative to `now` in seconds.
    pub fn age_s(&self, now: DateTime<Utc>) -> f64 {
        now.signed_duration_since(self.timestamp).num_milliseconds() as f64 * 0.001
    }
}
