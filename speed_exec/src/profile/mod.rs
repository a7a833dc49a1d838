//! # Speed profile module
//!
//! A speed profile is a pre-recorded table of target speeds against time. The table is built once
//! at startup and is read-only afterwards, so it can be shared between any number of readers.
//!
//! Target speeds between two samples are found by linear interpolation. Outside of the table the
//! first or last speed is held.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod loader;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of samples required to interpolate.
pub const MIN_NUM_SAMPLES: usize = 2;

/// Number of samples below which the gain estimation law has too few points to difference across.
pub const RECOMMENDED_NUM_SAMPLES: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single row of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    /// Time since the start of the profile.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Target speed at this time.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// Immutable time to target speed lookup table.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    samples: Vec<ProfileSample>,

    /// Sample times, non-decreasing
    times: Vec<f64>,

    /// Sample speeds, parallel to `times`
    speeds: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while loading a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Could not read the profile: {0}")]
    ReadError(csv::Error),

    #[error("The profile has no \"{0}\" column")]
    MissingColumn(String),

    #[error("Row {row} of the profile has an invalid {column} value \"{value}\"")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid profile: {0}")]
    Invalid(#[from] InvalidProfile),
}

/// Reasons a set of samples cannot form a profile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidProfile {
    #[error("expected at least 2 samples, found {0}")]
    TooFewSamples(usize),

    #[error("sample {index} has a negative time ({time_s} s)")]
    NegativeTime { index: usize, time_s: f64 },

    #[error("sample {index} is not finite ({time_s} s, {speed_ms} m/s)")]
    NonFiniteSample {
        index: usize,
        time_s: f64,
        speed_ms: f64,
    },

    #[error("sample {index} goes back in time ({time_s} s after {prev_time_s} s)")]
    NonMonotonicTime {
        index: usize,
        prev_time_s: f64,
        time_s: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileTable {
    /// Build a table from an ordered list of samples.
    ///
    /// Times must be finite, non-negative and non-decreasing. Two samples sharing a time form a
    /// step, in which case looking up that exact time gives the later sample's speed. A step at
    /// the first time is the exception: lookups at or before it give the first sample's speed.
    pub fn new(samples: Vec<ProfileSample>) -> Result<Self, InvalidProfile> {
        if samples.len() < MIN_NUM_SAMPLES {
            return Err(InvalidProfile::TooFewSamples(samples.len()));
        }

        for (index, s) in samples.iter().enumerate() {
            if !s.time_s.is_finite() || !s.speed_ms.is_finite() {
                return Err(InvalidProfile::NonFiniteSample {
                    index,
                    time_s: s.time_s,
                    speed_ms: s.speed_ms,
                });
            }

            if s.time_s < 0.0 {
                return Err(InvalidProfile::NegativeTime {
                    index,
                    time_s: s.time_s,
                });
            }
        }

        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].time_s < pair[0].time_s {
                return Err(InvalidProfile::NonMonotonicTime {
                    index: index + 1,
                    prev_time_s: pair[0].time_s,
                    time_s: pair[1].time_s,
                });
            }
        }

        let times = samples.iter().map(|s| s.time_s).collect();
        let speeds = samples.iter().map(|s| s.speed_ms).collect();

        Ok(Self {
            samples,
            times,
            speeds,
        })
    }

    /// Get the target speed at the given time.
    ///
    /// Times before the first sample give the first speed, times after the last sample give the
    /// last speed. A NaN time gives a NaN speed.
    pub fn lookup(&self, time_s: f64) -> f64 {
        if time_s.is_nan() {
            return std::f64::NAN;
        }

        let last = self.times.len() - 1;

        if time_s <= self.times[0] {
            return self.speeds[0];
        }
        if time_s >= self.times[last] {
            return self.speeds[last];
        }

        // Index of the first sample strictly after `time_s`. The clamps above guarantee
        // `1 <= i <= last` and `times[i - 1] <= time_s < times[i]`.
        let i = self.times.partition_point(|&t| t <= time_s);

        lin_map(
            (self.times[i - 1], self.times[i]),
            (self.speeds[i - 1], self.speeds[i]),
            time_s,
        )
    }

    /// Time of the first sample.
    pub fn start_time_s(&self) -> f64 {
        self.times[0]
    }

    /// Time of the last sample, the point at which the profile has ended.
    pub fn end_time_s(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Number of samples in the table.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false, a table holds at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ProfileSample] {
        &self.samples
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }
}

impl ProfileSample {
    pub fn new(time_s: f64, speed_ms: f64) -> Self {
        Self { time_s, speed_ms }
    }
}
