use std::fmt::{Debug, Display, Formatter};

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::quantity::energy::Energy;

/// Integer percentage, used for the conversion efficiencies.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub u8);

impl Percent {
    pub const HUNDRED: Self = Self(100);

    /// Apply the percentage to the energy, rounding towards negative infinity.
    ///
    /// Floor rounding never creates energy: applying it twice loses at most one unit per step.
    #[must_use]
    pub fn apply(self, energy: Energy) -> Energy {
        Energy((energy.0 * i64::from(self.0)).div_euclid(100))
    }

    /// Check that the percentage is within `1..=100`.
    #[must_use]
    pub const fn is_valid_efficiency(self) -> bool {
        self.0 >= 1 && self.0 <= Self::HUNDRED.0
    }
}

impl Debug for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} %", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_floors() {
        assert_eq!(Percent(90).apply(Energy(45)), Energy(40));
        assert_eq!(Percent(90).apply(Energy(50)), Energy(45));
    }

    #[test]
    fn apply_hundred_is_identity() {
        assert_eq!(Percent::HUNDRED.apply(Energy(123)), Energy(123));
    }

    #[test]
    fn valid_efficiency() {
        assert!(Percent(1).is_valid_efficiency());
        assert!(Percent(100).is_valid_efficiency());
        assert!(!Percent(0).is_valid_efficiency());
        assert!(!Percent(101).is_valid_efficiency());
    }
}
