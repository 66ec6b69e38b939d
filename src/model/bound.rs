//! Upper bounds on row counts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative upper bound on the row count of a relation or intermediate result.
///
/// Bounds are never point estimates. Arithmetic saturates at `u128::MAX`, and a
/// saturated value is still a valid upper bound.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bound(u128);

impl Bound {
    pub const ZERO: Bound = Bound(0);
    pub const ONE: Bound = Bound(1);
    pub const MAX: Bound = Bound(u128::MAX);

    pub const fn new(rows: u128) -> Self {
        Self(rows)
    }

    pub const fn rows(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Round a fractional row count up to the next integer bound.
    ///
    /// Returns `None` for NaN and negative values. Infinity maps to [`Bound::MAX`].
    pub fn from_f64(rows: f64) -> Option<Self> {
        if rows.is_nan() || rows < 0.0 {
            return None;
        }
        if rows.is_infinite() {
            return Some(Self::MAX);
        }
        // `as` saturates for values beyond u128::MAX
        Some(Self(rows.ceil() as u128))
    }

    pub fn saturating_mul(self, other: Bound) -> Bound {
        Bound(self.0.saturating_mul(other.0))
    }

    pub fn saturating_add(self, other: Bound) -> Bound {
        Bound(self.0.saturating_add(other.0))
    }
}

impl From<u64> for Bound {
    fn from(rows: u64) -> Self {
        Self(u128::from(rows))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
