//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// When `value` equals `source_range.0` the result is exactly
/// `target_range.0`.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Limit a value to the closed range `[min, max]`.
///
/// NaN is passed through unchanged so that callers can detect it.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (10f64, 20f64), 0.5), 15.0);
        assert_eq!(lin_map((1f64, 3f64), (20f64, 10f64), 1.0), 20.0);
        assert_eq!(lin_map((1f64, 3f64), (20f64, 10f64), 3.0), 10.0);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 100f64), 0.0), 50.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-7.0f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25f64, -1.0, 1.0), 0.25);
        assert_eq!(clamp(std::f64::INFINITY, -1.0, 1.0), 1.0);
        assert!(clamp(std::f64::NAN, -1.0, 1.0).is_nan());
    }
}
