//! Amount helpers shared by the engine and the request/response boundary.
//!
//! Amounts travel as `f64` internally and are only rounded when they leave the
//! engine or are posted from a source document, so intermediate sums never
//! accumulate rounding drift.

/// Default tolerance under which debit and credit totals are considered equal.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// Rounds to two decimals, ties away from zero (half-up for positive amounts).
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // Nudge by a sub-cent epsilon so binary representations of x.xx5 round up.
    let nudge = if value >= 0.0 { 1e-9 } else { -1e-9 };
    let rounded = ((value + nudge) * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Slack absorbing binary representation error of cent amounts.
const FLOAT_SLACK: f64 = 1e-9;

/// Returns true when both amounts differ by no more than `tolerance`.
pub fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance + FLOAT_SLACK
}

/// Treats sub-cent residue as zero.
pub fn is_zero(value: f64) -> bool {
    value.abs() < 0.005
}
