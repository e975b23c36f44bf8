//! Float comparisons for power balances and parameter checks.

use crate::error::{GfError, GfResult};

/// Floating point type used for powers, impedances and costs.
pub type Real = f64;

/// Absolute and relative slack used when comparing powers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    pub const POWER: Tolerances = Tolerances {
        abs: 1e-9,
        rel: 1e-9,
    };

    /// Whether `a` and `b` differ by no more than the absolute slack, or the
    /// relative slack scaled by the larger magnitude.
    pub fn close(&self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }

    /// `a > b` beyond the tolerance.
    pub fn exceeds(&self, a: Real, b: Real) -> bool {
        a > b && !self.close(a, b)
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::POWER
    }
}

/// Reject NaN and infinities, naming the offending parameter.
pub fn ensure_finite(value: Real, what: &'static str) -> GfResult<Real> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GfError::NonFinite { what, value })
    }
}
