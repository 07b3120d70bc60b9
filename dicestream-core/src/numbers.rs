//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert an index or width to f64.
#[must_use]
pub fn index_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Round a non-negative value to the nearest index; negative or non-finite
/// input yields 0.
#[must_use]
pub fn round_to_index(value: f64) -> usize {
    cast::<f64, usize>(value.round()).unwrap_or(0)
}

/// Round to `places` decimal digits, leaving non-finite values untouched.
#[must_use]
pub fn round_to_places(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

/// Interpret a signed cadence as a positive interval, `None` when disabled.
#[must_use]
pub fn positive_interval(interval: i64) -> Option<u64> {
    if interval <= 0 {
        return None;
    }
    cast::<i64, u64>(interval)
}
