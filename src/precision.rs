//! Rounding values onto a venue's tick / step grid.

/// Rounding direction when snapping to a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Nearest grid point (ties away from zero)
    Nearest,
    /// Toward zero (truncate)
    Down,
}

// Tolerance in grid units so that 0.3 / 0.1 = 2.9999999 still floors to 3.
const GRID_EPSILON: f64 = 1e-9;

/// Snap `value` onto multiples of `step`.
///
/// A non-positive or non-finite `step` means the venue publishes no grid and
/// `value` is returned unchanged. The result is cleaned of binary float noise
/// to the number of decimals implied by `step`.
///
/// ```
/// use pairbalance::precision::{round_to_step, Rounding};
///
/// assert_eq!(round_to_step(1400.456, 0.01, Rounding::Nearest), 1400.46);
/// assert_eq!(round_to_step(0.428_571, 0.0001, Rounding::Down), 0.4285);
/// assert_eq!(round_to_step(0.3, 0.1, Rounding::Down), 0.3);
/// ```
pub fn round_to_step(value: f64, step: f64, rounding: Rounding) -> f64 {
    if !(step.is_finite() && step > 0.0) || !value.is_finite() {
        return value;
    }
    let units = value / step;
    let snapped = match rounding {
        Rounding::Nearest => units.round(),
        Rounding::Down => (units + GRID_EPSILON).floor(),
    };
    clean(snapped * step, decimals_of(step))
}

/// Number of decimals needed to represent multiples of `step`.
pub fn decimals_of(step: f64) -> i32 {
    if !(step.is_finite() && step > 0.0) {
        return 0;
    }
    (-step.log10() - GRID_EPSILON).ceil().max(0.0) as i32
}

fn clean(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_tick() {
        assert_eq!(round_to_step(1400.004, 0.01, Rounding::Nearest), 1400.0);
        assert_eq!(round_to_step(1400.006, 0.01, Rounding::Nearest), 1400.01);
        assert_eq!(round_to_step(101.3, 0.5, Rounding::Nearest), 101.5);
    }

    #[test]
    fn truncate_amount() {
        assert_eq!(round_to_step(0.999_99, 0.001, Rounding::Down), 0.999);
        assert_eq!(round_to_step(12.0, 1.0, Rounding::Down), 12.0);
    }

    #[test]
    fn float_noise_is_absorbed() {
        assert_eq!(round_to_step(0.7, 0.1, Rounding::Down), 0.7);
        assert_eq!(round_to_step(0.3, 0.1, Rounding::Nearest), 0.3);
    }

    #[test]
    fn no_grid_passthrough() {
        assert_eq!(round_to_step(1.234_567, 0.0, Rounding::Nearest), 1.234_567);
        assert_eq!(round_to_step(1.234_567, f64::NAN, Rounding::Down), 1.234_567);
    }

    #[test]
    fn decimals() {
        assert_eq!(decimals_of(0.01), 2);
        assert_eq!(decimals_of(0.5), 1);
        assert_eq!(decimals_of(1.0), 0);
        assert_eq!(decimals_of(10.0), 0);
        assert_eq!(decimals_of(0.00001), 5);
    }
}
