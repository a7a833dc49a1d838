//! Parameters structure for speed control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{ControlLaw, GainEstimationLaw, ProportionalLaw};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for speed control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// The law used to compute commands.
    #[serde(default)]
    pub law: LawKind,

    /// The control period.
    ///
    /// Units: seconds
    pub period_s: f64,

    // ---- COMMANDS ----
    /// Command used when the previous command was zero or when the vehicle showed no response.
    #[serde(default = "default_default_command")]
    pub default_command: f64,

    /// Lowest command that may be sent (full braking).
    #[serde(default = "default_min_command")]
    pub min_command: f64,

    /// Highest command that may be sent (full throttle).
    #[serde(default = "default_max_command")]
    pub max_command: f64,

    // ---- PROPORTIONAL ----
    /// Gain of the proportional law.
    ///
    /// Units: 1/(meters/second)
    #[serde(default = "default_prop_gain")]
    pub prop_gain: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Available control laws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawKind {
    GainEstimation,
    Proportional,
}

/// Errors in the speed control parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("The control period must be positive and finite, got {0} s")]
    InvalidPeriod(f64),

    #[error("The default command must be finite, got {0}")]
    NonFiniteDefaultCommand(f64),

    #[error("Command bounds must satisfy -1 <= min < max <= 1, got [{min}, {max}]")]
    InvalidCommandBounds { min: f64, max: f64 },

    #[error("The default command ({0}) is outside of the command bounds")]
    DefaultCommandOutOfBounds(f64),

    #[error("The proportional gain must be finite, got {0}")]
    InvalidGain(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LawKind {
    fn default() -> Self {
        LawKind::GainEstimation
    }
}

impl Params {
    /// Create a new set of parameters with the default commands for the given period.
    pub fn with_period(period_s: f64) -> Self {
        Self {
            law: LawKind::default(),
            period_s,
            default_command: default_default_command(),
            min_command: default_min_command(),
            max_command: default_max_command(),
            prop_gain: default_prop_gain(),
        }
    }

    /// Check that the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.period_s.is_finite() && self.period_s > 0.0) {
            return Err(ParamsError::InvalidPeriod(self.period_s));
        }

        if !self.default_command.is_finite() {
            return Err(ParamsError::NonFiniteDefaultCommand(self.default_command));
        }

        if !(self.min_command >= -1.0
            && self.max_command <= 1.0
            && self.min_command < self.max_command)
        {
            return Err(ParamsError::InvalidCommandBounds {
                min: self.min_command,
                max: self.max_command,
            });
        }

        if self.default_command < self.min_command || self.default_command > self.max_command {
            return Err(ParamsError::DefaultCommandOutOfBounds(self.default_command));
        }

        if !self.prop_gain.is_finite() {
            return Err(ParamsError::InvalidGain(self.prop_gain));
        }

        Ok(())
    }

    /// Build the law selected by these parameters.
    pub fn build_law(&self) -> Box<dyn ControlLaw> {
        match self.law {
            LawKind::GainEstimation => Box::new(GainEstimationLaw {
                default_command: self.default_command,
                min_command: self.min_command,
                max_command: self.max_command,
            }),
            LawKind::Proportional => Box::new(ProportionalLaw {
                k_p: self.prop_gain,
                min_command: self.min_command,
                max_command: self.max_command,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_default_command() -> f64 {
    0.1
}

fn default_min_command() -> f64 {
    -1.0
}

fn default_max_command() -> f64 {
    1.0
}

fn default_prop_gain() -> f64 {
    0.05
}
