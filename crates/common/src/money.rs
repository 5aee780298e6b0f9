//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};

/// Money amount represented in minor units (kopecks) to avoid floating point
/// drift when formatting amounts for the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
}

impl Money {
    /// Creates an amount from a major-unit value such as `300.5`.
    ///
    /// Rounds half away from zero to the nearest minor unit.
    pub fn from_major(major: f64) -> Self {
        Self {
            minor: (major * 100.0).round() as i64,
        }
    }

    fn major_part(&self) -> i64 {
        self.minor / 100
    }

    fn minor_part(&self) -> i64 {
        self.minor.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }
}

/// Formats as a plain decimal with two fractional digits (`"300.00"`), the
/// representation payment providers expect in amount fields.
impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.minor < 0 {
            write!(f, "-{}.{:02}", self.major_part().abs(), self.minor_part())
        } else {
            write!(f, "{}.{:02}", self.major_part(), self.minor_part())
        }
    }
}
