//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Clamp a probability into `[0, 1]`, treating NaN as an impossible event.
#[must_use]
pub fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Map a unit draw onto an index in `0..len`, saturating at the last slot.
#[must_use]
pub fn unit_to_index(unit: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let scaled = (clamp_probability(unit) * cast::<usize, f64>(len).unwrap_or(0.0)).floor();
    cast::<f64, usize>(scaled).unwrap_or(0).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_clamp_handles_nan_and_bounds() {
        assert!(clamp_probability(f64::NAN).abs() < f64::EPSILON);
        assert!((clamp_probability(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_probability(-0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn unit_index_saturates() {
        assert_eq!(unit_to_index(0.0, 4), 0);
        assert_eq!(unit_to_index(0.99, 4), 3);
        assert_eq!(unit_to_index(1.0, 4), 3);
        assert_eq!(unit_to_index(0.5, 0), 0);
    }
}
