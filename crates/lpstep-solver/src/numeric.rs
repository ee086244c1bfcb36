//! Tolerance helpers shared by both solvers.

/// Default tolerance for zero tests, deduplication and ties.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Equality within `tolerance`, scaled by the larger operand once it exceeds 1.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * 1f64.max(a.abs()).max(b.abs())
}

/// Maps `-0.0` to `0.0` so rendered output never shows a negative zero.
pub(crate) fn unsigned_zero(value: f64) -> f64 {
    value + 0.0
}
