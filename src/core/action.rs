use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::quantity::{Zero, energy::Energy};

/// Kind of the battery action, without the amount.
#[derive(Debug, Hash, Serialize, Deserialize, clap::ValueEnum, enumset::EnumSetType)]
#[serde(rename_all = "kebab-case")]
#[enumset(serialize_repr = "list")]
pub enum ActionKind {
    /// Do not do anything, the grid covers the net demand.
    Idle,

    /// Charge from the grid.
    Charge,

    /// Discharge to the household or the grid.
    Discharge,
}

impl ActionKind {
    /// Tie-break rank at equal amounts.
    const fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Charge => 1,
            Self::Discharge => 2,
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Self::Idle => Color::Reset,
            Self::Charge => Color::Green,
            Self::Discharge => Color::Blue,
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Charge => write!(f, "Charge"),
            Self::Discharge => write!(f, "Discharge"),
        }
    }
}

/// Single-slot battery action.
///
/// The amount of [`Action::Charge`] is the energy drawn from the grid before the efficiency loss,
/// and the amount of [`Action::Discharge`] is the energy taken from the storage before the loss.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Idle,
    Charge(Energy),
    Discharge(Energy),
}

impl Action {
    pub const fn kind(self) -> ActionKind {
        match self {
            Self::Idle => ActionKind::Idle,
            Self::Charge(_) => ActionKind::Charge,
            Self::Discharge(_) => ActionKind::Discharge,
        }
    }

    pub const fn amount(self) -> Energy {
        match self {
            Self::Idle => Energy::ZERO,
            Self::Charge(amount) | Self::Discharge(amount) => amount,
        }
    }
}

/// Tie-break order: smaller amounts first, so that [`Action::Idle`] always comes first,
/// and charging precedes discharging at equal amounts.
///
/// Among equal-cost schedules, the solver picks the lexicographically smallest action sequence.
impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount()
            .cmp(&other.amount())
            .then_with(|| self.kind().rank().cmp(&other.kind().rank()))
    }
}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Charge(amount) => write!(f, "Charge {amount}"),
            Self::Discharge(amount) => write!(f, "Discharge {amount}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_comes_first() {
        assert!(Action::Idle < Action::Charge(Energy(1)));
        assert!(Action::Idle < Action::Discharge(Energy(1)));
    }

    #[test]
    fn smaller_amounts_first() {
        assert!(Action::Discharge(Energy(5)) < Action::Charge(Energy(6)));
        assert!(Action::Charge(Energy(5)) < Action::Discharge(Energy(5)));
    }

    #[test]
    fn sequences_compare_lexicographically() {
        let lhs = [Action::Idle, Action::Discharge(Energy(10))];
        let rhs = [Action::Charge(Energy(1)), Action::Idle];
        assert!(lhs.as_slice() < rhs.as_slice());
    }
}
