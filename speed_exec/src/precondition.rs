//! # Precondition check
//!
//! The vehicle must be offroad before the speed controller may command it. The platform records
//! this as a flag file in its parameter directory. Setting the bypass environment variable skips
//! the check, for bench testing with the vehicle stack running.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fs, path::PathBuf};

use log::{info, warn};
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the flag file set by the platform when the vehicle is offroad.
pub const OFFROAD_FLAG: &str = "IsOffroad";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreconditionParams {
    /// Directory holding the platform's parameter files.
    pub params_dir: PathBuf,

    /// If this environment variable is set the check passes.
    pub bypass_env: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("The vehicle must be offroad before running the speed controller")]
    VehicleOnroad,

    #[error("Could not read the offroad flag from {0:?}: {1}")]
    CannotRead(PathBuf, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PreconditionParams {
    fn default() -> Self {
        Self {
            params_dir: PathBuf::from("/data/params/d"),
            bypass_env: String::from("ZMQ"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that the vehicle may be commanded.
pub fn check_offroad(params: &PreconditionParams) -> Result<(), PreconditionError> {
    if std::env::var_os(&params.bypass_env).is_some() {
        warn!(
            "{} is set, skipping the offroad check",
            params.bypass_env
        );
        return Ok(());
    }

    let flag_path = params.params_dir.join(OFFROAD_FLAG);

    let flag = fs::read_to_string(&flag_path)
        .map_err(|e| PreconditionError::CannotRead(flag_path.clone(), e))?;

    match flag.trim() {
        "1" => {
            info!("Vehicle is offroad");
            Ok(())
        }
        _ => Err(PreconditionError::VehicleOnroad),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params_in(name: &str, flag: Option<&str>) -> PreconditionParams {
        let mut dir = std::env::temp_dir();
        dir.push(format!("speed_exec_precondition_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        if let Some(f) = flag {
            fs::write(dir.join(OFFROAD_FLAG), f).unwrap();
        }

        PreconditionParams {
            params_dir: dir,
            bypass_env: format!("SPEED_EXEC_TEST_BYPASS_{}", name.to_uppercase()),
        }
    }

    #[test]
    fn test_offroad() {
        let p = params_in("offroad", Some("1\n"));
        assert!(check_offroad(&p).is_ok());
        fs::remove_dir_all(&p.params_dir).ok();
    }

    #[test]
    fn test_onroad() {
        let p = params_in("onroad", Some("0"));
        assert!(matches!(
            check_offroad(&p),
            Err(PreconditionError::VehicleOnroad)
        ));
        fs::remove_dir_all(&p.params_dir).ok();
    }

    #[test]
    fn test_missing_flag() {
        let p = params_in("missing", None);
        assert!(matches!(
            check_offroad(&p),
            Err(PreconditionError::CannotRead(_, _))
        ));
        fs::remove_dir_all(&p.params_dir).ok();
    }

    #[test]
    fn test_bypass() {
        let p = params_in("bypass", None);
        std::env::set_var(&p.bypass_env, "1");
        assert!(check_offroad(&p).is_ok());
        std::env::remove_var(&p.bypass_env);
        fs::remove_dir_all(&p.params_dir).ok();
    }
}
