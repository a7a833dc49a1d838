//! Parameters structure for the control loop

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the control loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// What to do when the end of the profile is reached.
    pub mode: LoopMode,

    /// Speed used in place of the measurement when no feedback is available.
    ///
    /// Units: meters/second
    pub fallback_speed_ms: f64,

    /// Values sent on the auxiliary (non gas/brake) axes, each in [-1, 1].
    pub aux_axes: Vec<f64>,

    /// If true the default command is sent once before the first cycle to get the vehicle moving.
    pub kickstart: bool,

    /// Number of consecutive cycles without feedback after which the input is reported as
    /// degraded. Must be at least 1.
    pub feedback_degraded_ticks: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Behaviour at the end of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Restart the profile from the beginning, running until cancelled.
    Wrap,

    /// Stop once the end of the profile is reached.
    Once,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("The fallback speed must be finite, got {0} m/s")]
    NonFiniteFallbackSpeed(f64),

    #[error("Auxiliary axis {index} value {value} is outside of [-1, 1]")]
    AuxAxisOutOfBounds { index: usize, value: f64 },

    #[error("feedback_degraded_ticks must be at least 1")]
    ZeroDegradedTicks,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            mode: LoopMode::Wrap,
            fallback_speed_ms: 0.0,
            aux_axes: vec![0.0],
            kickstart: true,
            feedback_degraded_ticks: 10,
        }
    }
}

impl Default for LoopMode {
    fn default() -> Self {
        LoopMode::Wrap
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.fallback_speed_ms.is_finite() {
            return Err(ParamsError::NonFiniteFallbackSpeed(self.fallback_speed_ms));
        }

        for (index, &value) in self.aux_axes.iter().enumerate() {
            if !(-1.0..=1.0).contains(&value) {
                return Err(ParamsError::AuxAxisOutOfBounds { index, value });
            }
        }

        if self.feedback_degraded_ticks == 0 {
            return Err(ParamsError::ZeroDegradedTicks);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: Params = util::params::from_str("").unwrap();

        assert_eq!(p.mode, LoopMode::Wrap);
        assert_eq!(p.fallback_speed_ms, 0.0);
        assert_eq!(p.aux_axes, vec![0.0]);
        assert!(p.kickstart);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let p: Params = util::params::from_str("mode = \"once\"\naux_axes = [0.0, 1.5]").unwrap();
        assert_eq!(p.mode, LoopMode::Once);
        assert_eq!(
            p.validate(),
            Err(ParamsError::AuxAxisOutOfBounds {
                index: 1,
                value: 1.5
            })
        );

        let p = Params {
            fallback_speed_ms: std::f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamsError::NonFiniteFallbackSpeed(_))
        ));

        let p: Params = util::params::from_str("feedback_degraded_ticks = 0").unwrap();
        assert_eq!(p.validate(), Err(ParamsError::ZeroDegradedTicks));
    }
}
