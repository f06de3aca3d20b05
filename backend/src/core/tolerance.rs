//! Numerical tolerance
//!
//! Invariants such as conservation are checked to within ε relative to the
//! size of the market, `max(S, D)`, and a node's fill bound to within ε
//! relative to its capacity. The slack is purely relative at every scale: a
//! zero scale leaves no slack at all, so zero quantities must match exactly.

use serde::{Deserialize, Serialize};

/// Default relative tolerance.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance {
    relative: f64,
}

impl Tolerance {
    pub const fn new(relative: f64) -> Self {
        Self { relative }
    }

    pub fn relative(&self) -> f64 {
        self.relative
    }

    /// Absolute slack for quantities of magnitude `scale`.
    pub fn absolute(&self, scale: f64) -> f64 {
        self.relative * scale.abs()
    }

    /// `a` and `b` agree within the slack for `scale`.
    pub fn approx_eq(&self, a: f64, b: f64, scale: f64) -> bool {
        (a - b).abs() <= self.absolute(scale)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_RELATIVE_TOLERANCE)
    }
}
