use std::ops::Mul;

use crate::quantity::{Zero, cost::Cost, price::Price};

quantity!(
    /// Energy in integer units, the resolution of the solver's state space.
    Energy,
    "Wh"
);

impl Energy {
    /// Convert the energy level into a state index of the solution space.
    ///
    /// Negative energy never reaches the solution space, this is checked during validation.
    #[must_use]
    pub fn as_index(self) -> usize {
        usize::try_from(self.0.max(0)).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(i64::try_from(index).unwrap_or(i64::MAX))
    }

    /// Split the signed grid exchange into import and export.
    #[must_use]
    pub fn split(self) -> (Self, Self) {
        if self >= Self::ZERO { (self, Self::ZERO) } else { (Self::ZERO, -self) }
    }
}

impl Mul<Price> for Energy {
    type Output = Cost;

    fn mul(self, rhs: Price) -> Self::Output {
        Cost(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_import() {
        assert_eq!(Energy(5).split(), (Energy(5), Energy::ZERO));
    }

    #[test]
    fn split_export() {
        assert_eq!(Energy(-5).split(), (Energy::ZERO, Energy(5)));
    }

    #[test]
    fn index_round_trip() {
        assert_eq!(Energy::from_index(Energy(42).as_index()), Energy(42));
    }

    #[test]
    fn negative_index_saturates() {
        assert_eq!(Energy(-1).as_index(), 0);
    }
}
