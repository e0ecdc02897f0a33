use std::cmp::Ordering;

use crate::{
    core::action::Action,
    quantity::{Zero, cost::Cost, energy::Energy},
};

/// Optimal decision in a given slot and state.
#[derive(Copy, Clone, Debug)]
pub struct Decision {
    /// Cost from the beginning of the slot until the end of the horizon.
    pub cost_to_go: Cost,

    pub action: Action,
    pub state_after: Energy,
}

pub struct SolutionSpace {
    /// Energy dimension size.
    n_states: usize,

    /// Time dimension size.
    n_slots: usize,

    /// Terminal reserve which defines the boundary row.
    min_final_state: Energy,

    /// Flattened 2D array of decisions to speed up the lookups.
    ///
    /// Here, [`None`] means there is no feasible continuation from the given state.
    flat_matrix: Vec<Option<Decision>>,
}

impl SolutionSpace {
    pub fn new(n_slots: usize, capacity: Energy, min_final_state: Energy) -> Self {
        let n_states = capacity.as_index() + 1;
        Self { n_states, n_slots, min_final_state, flat_matrix: vec![None; n_slots * n_states] }
    }

    pub const fn n_states(&self) -> usize {
        self.n_states
    }

    /// Get the optimal cost-to-go at the given slot index and state.
    ///
    /// The index right past the last slot is the boundary: zero cost for the states satisfying
    /// the terminal reserve.
    pub fn cost_to_go(&self, slot_index: usize, state: Energy) -> Option<Cost> {
        match slot_index.cmp(&self.n_slots) {
            Ordering::Less => self.flat_matrix[self.flat_index(slot_index, state)]
                .map(|decision| decision.cost_to_go),
            Ordering::Equal => (state >= self.min_final_state).then_some(Cost::ZERO),
            Ordering::Greater => {
                panic!("slot index is out of bounds ({slot_index})");
            }
        }
    }

    /// Mutable decisions of the whole slot, indexed by state.
    pub fn row_mut(&mut self, slot_index: usize) -> &mut [Option<Decision>] {
        debug_assert!(slot_index < self.n_slots, "slot index is out of bounds ({slot_index})");
        let start = slot_index * self.n_states;
        &mut self.flat_matrix[start..start + self.n_states]
    }

    /// Follow the decisions from the initial state.
    ///
    /// # Returns
    ///
    /// Optimal cost and actions, or [`None`] if the initial state has no feasible continuation.
    pub fn backtrack(&self, initial_state: Energy) -> Option<(Cost, Vec<Action>)> {
        let cost = self.cost_to_go(0, initial_state)?;
        let mut state = initial_state;
        let actions = (0..self.n_slots)
            .map(|slot_index| {
                let decision = self.flat_matrix[self.flat_index(slot_index, state)]?;
                state = decision.state_after;
                Some(decision.action)
            })
            .collect::<Option<Vec<_>>>()?;
        Some((cost, actions))
    }

    /// Convert the indices into the respective index in the flattened array.
    #[must_use]
    fn flat_index(&self, slot_index: usize, state: Energy) -> usize {
        debug_assert!(state.as_index() < self.n_states);
        slot_index * self.n_states + state.as_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_respects_reserve() {
        let space = SolutionSpace::new(2, Energy(10), Energy(3));
        assert_eq!(space.cost_to_go(2, Energy(2)), None);
        assert_eq!(space.cost_to_go(2, Energy(3)), Some(Cost::ZERO));
        assert_eq!(space.cost_to_go(1, Energy(3)), None);
    }

    #[test]
    fn backtrack() {
        let mut space = SolutionSpace::new(2, Energy(5), Energy::ZERO);
        space.row_mut(1)[4] = Some(Decision {
            cost_to_go: Cost(-40),
            action: Action::Discharge(Energy(4)),
            state_after: Energy(0),
        });
        space.row_mut(0)[0] = Some(Decision {
            cost_to_go: Cost(10),
            action: Action::Charge(Energy(5)),
            state_after: Energy(4),
        });
        assert_eq!(
            space.backtrack(Energy(0)),
            Some((Cost(10), vec![Action::Charge(Energy(5)), Action::Discharge(Energy(4))])),
        );
        assert_eq!(space.backtrack(Energy(1)), None);
    }
}
