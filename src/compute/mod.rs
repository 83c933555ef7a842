pub mod arithmetic;
pub mod cpu;
pub mod engine;
pub mod legacy;
pub mod overhead;

pub use arithmetic::{FlopsModel, FlopsMultipliers, ServingPattern};
pub use engine::{CapacityEngine, EngineTables};
pub use overhead::{OverheadCombination, Overheads, Redundancy};

/// Max users reported when the workload places no compute demand per user
pub const UNBOUNDED_USERS: u64 = u64::MAX;

/// Relative slack when flooring user counts, absorbs float noise from
/// dividing back through a ceiled unit count
const FLOOR_SLACK: f64 = 1e-9;

/// Replace NaN/inf with 0 before a value is surfaced
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        log::warn!("non-finite intermediate {} replaced with 0", value);
        0.0
    }
}

/// Round a fractional unit count up; non-positive or non-finite gives 0
pub(crate) fn ceil_units(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.ceil() as u64
    } else {
        0
    }
}

/// Round a fractional user count down; non-positive or non-finite gives 0
pub(crate) fn floor_users(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        (value * (1.0 + FLOOR_SLACK)).floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(ceil_units(4.01), 5);
        assert_eq!(ceil_units(4.0), 4);
        assert_eq!(ceil_units(-1.0), 0);
        assert_eq!(ceil_units(f64::INFINITY), 0);

        assert_eq!(floor_users(11_688.3), 11_688);
        // Just below an integer because of division noise
        assert_eq!(floor_users(9_999.999_999_999_8), 10_000);
        assert_eq!(floor_users(f64::NAN), 0);

        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(2.5), 2.5);
    }
}
