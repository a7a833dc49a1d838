//! # Speed Executable Parameters
//!
//! This module provides the parameters for the speed executable, loaded from a single TOML file
//! with one table per module.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use comms_if::net::NetParams;

use crate::{ctrl_loop, precondition::PreconditionParams, profile::ProfileParams, sim::SimParams, speed_ctrl};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedExecParams {
    pub ctrl: speed_ctrl::Params,

    #[serde(rename = "loop", default)]
    pub loop_: ctrl_loop::Params,

    pub profile: ProfileParams,

    pub net: NetParams,

    #[serde(default)]
    pub precondition: PreconditionParams,

    #[serde(default)]
    pub sim: SimParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid speed control parameters: {0}")]
    Ctrl(#[from] speed_ctrl::ParamsError),

    #[error("Invalid control loop parameters: {0}")]
    Loop(#[from] ctrl_loop::ParamsError),

    #[error("The maximum telemetry age must be positive, got {0} s")]
    InvalidTelemetryAge(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpeedExecParams {
    /// Check all parameters are consistent.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.ctrl.validate()?;
        self.loop_.validate()?;

        if let Some(age) = self.net.max_telemetry_age_s {
            if !(age > 0.0) {
                return Err(ParamsError::InvalidTelemetryAge(age));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ctrl_loop::LoopMode, profile::SpeedUnit, speed_ctrl::LawKind};

    const PARAMS: &str = r#"
        [ctrl]
        period_s = 0.02

        [loop]
        mode = "once"
        fallback_speed_ms = 1.0

        [profile]
        speed_unit = "mph"

        [net]
        actuation_endpoint = "tcp://*:5010"
        telemetry_endpoint = "tcp://localhost:5011"
    "#;

    #[test]
    fn test_load() {
        let p: SpeedExecParams = util::params::from_str(PARAMS).unwrap();

        assert_eq!(p.ctrl.law, LawKind::GainEstimation);
        assert_eq!(p.ctrl.period_s, 0.02);
        assert_eq!(p.loop_.mode, LoopMode::Once);
        assert_eq!(p.profile.speed_unit, SpeedUnit::Mph);
        assert_eq!(p.precondition.bypass_env, "ZMQ");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_speed_unit_required() {
        let no_unit = PARAMS.replace("speed_unit = \"mph\"", "");
        let r: Result<SpeedExecParams, _> = util::params::from_str(&no_unit);
        assert!(r.is_err());
    }

    #[test]
    fn test_validate() {
        let mut p: SpeedExecParams = util::params::from_str(PARAMS).unwrap();

        p.ctrl.period_s = -1.0;
        assert!(matches!(p.validate(), Err(ParamsError::Ctrl(_))));

        p.ctrl.period_s = 0.02;
        p.net.max_telemetry_age_s = Some(0.0);
        assert_eq!(p.validate(), Err(ParamsError::InvalidTelemetryAge(0.0)));
    }
}
