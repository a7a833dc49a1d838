//! Parameters for loading a speed profile

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Meters per second in one mile per hour (exact by definition of the mile).
pub const MPH_TO_MS: f64 = 0.44704;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the layout of a profile file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileParams {
    /// The unit the profile's speed column is written in. There is no default, the unit must
    /// always be declared.
    pub speed_unit: SpeedUnit,

    /// Name of the time column.
    #[serde(default = "default_time_column")]
    pub time_column: String,

    /// Name of the speed column.
    #[serde(default = "default_speed_column")]
    pub speed_column: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Units a profile's speeds may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Miles per hour
    Mph,

    /// Meters per second
    Mps,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SpeedUnit {
    /// Convert a speed in this unit to meters/second.
    pub fn to_ms(self, speed: f64) -> f64 {
        match self {
            SpeedUnit::Mph => speed * MPH_TO_MS,
            SpeedUnit::Mps => speed,
        }
    }
}

impl ProfileParams {
    /// Parameters for a file with the standard `time` and `speed` columns.
    pub fn with_unit(speed_unit: SpeedUnit) -> Self {
        Self {
            speed_unit,
            time_column: default_time_column(),
            speed_column: default_speed_column(),
        }
    }
}

fn default_time_column() -> String {
    "time".into()
}

fn default_speed_column() -> String {
    "speed".into()
}
