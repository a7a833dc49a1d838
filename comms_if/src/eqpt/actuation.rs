//! # Actuation Demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Index of the longitudinal (gas/brake) axis in [`ActuationDems::axes`].
pub const GAS_BRAKE_AXIS: usize = 0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are published to the vehicle.
///
/// The layout follows a joystick message: an ordered list of axis values followed by a list of
/// button states. The first axis is always the gas/brake command, any further axes are auxiliary
/// (for example steer) and are held at fixed values by the speed controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActuationDems {
    /// Axis values, each in the range [-1, 1].
    pub axes: Vec<f64>,

    /// Button states.
    pub buttons: Vec<bool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuationDems {
    /// Build the demands for a gas/brake command and the auxiliary axis values.
    ///
    /// Positive commands accelerate, negative commands brake. No buttons are pressed.
    pub fn new(gas_brake: f64, aux: &[f64]) -> Self {
        let mut axes = Vec::with_capacity(1 + aux.len());
        axes.push(gas_brake);
        axes.extend_from_slice(aux);

        Self {
            axes,
            buttons: vec![false],
        }
    }

    /// The gas/brake command carried by these demands.
    pub fn gas_brake(&self) -> Option<f64> {
        self.axes.get(GAS_BRAKE_AXIS).copied()
    }
}

impl Default for ActuationDems {
    fn default() -> Self {
        Self::new(0.0, &[0.0])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout() {
        let dems = ActuationDems::new(0.1, &[0.0]);
        assert_eq!(dems.axes, vec![0.1, 0.0]);
        assert_eq!(dems.buttons, vec![false]);
        assert_eq!(dems.gas_brake(), Some(0.1));

        let json = serde_json::to_string(&dems).unwrap();
        assert_eq!(json, r#"{"axes":[0.1,0.0],"buttons":[false]}"#);
    }
}
