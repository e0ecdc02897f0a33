//! Optimistic cost-to-go per slot and state.
//!
//! The states are grouped into buckets of consecutive levels, and the charge and discharge amounts
//! into ranges of the same width. A transition cost depends only on the action, while the state
//! only decides whether the action fits, so the cheapest move of a range, applied to a whole bucket
//! and landing anywhere it possibly may, never overestimates the true cost-to-go.
//! With one state per bucket, the bound is exact over the integer amounts.

use rayon::prelude::*;

use crate::{
    core::{action::Action, problem::Problem},
    prelude::*,
    quantity::{Zero, cost::Cost, energy::Energy},
};

/// Upper limit on the number of buckets per slot, capacities below it are bounded exactly.
pub const MAX_BUCKETS: usize = 256;

pub struct StateBound {
    /// Number of consecutive states in a bucket.
    width: usize,

    n_buckets: usize,
    capacity: Energy,

    /// Row-major `(horizon + 1) × n_buckets` matrix.
    ///
    /// [`None`] marks the buckets from which no schedule may reach the final state.
    cells: Vec<Option<Cost>>,
}

impl StateBound {
    #[instrument(skip_all, fields(max_buckets = max_buckets))]
    pub fn new(problem: &Problem, max_buckets: usize) -> Self {
        let capacity = problem.site().capacity;
        let n_states = capacity.as_index() + 1;
        let width = n_states.div_ceil(max_buckets.max(1));
        let n_buckets = n_states.div_ceil(width);
        let horizon = problem.horizon();
        let mut bound =
            Self { width, n_buckets, capacity, cells: vec![None; (horizon + 1) * n_buckets] };

        for bucket in 0..n_buckets {
            let (_, highest) = bound.states(bucket);
            if problem.is_final_state_allowed(highest) {
                bound.cells[horizon * n_buckets + bucket] = Some(Cost::ZERO);
            }
        }
        for slot_index in (0..horizon).rev() {
            let moves = SlotMoves::new(problem, slot_index, width);
            let row: Vec<Option<Cost>> = (0..n_buckets)
                .into_par_iter()
                .map(|bucket| bound.relax(&moves, slot_index + 1, bucket))
                .collect();
            bound.cells[slot_index * n_buckets..][..n_buckets].copy_from_slice(&row);
        }
        debug!(width, n_buckets, "bound is ready");
        bound
    }

    /// Lower bound on the cost of the slots starting with the given one.
    ///
    /// # Returns
    ///
    /// [`None`], if the final state is unreachable from the state.
    pub fn get(&self, slot_index: usize, state: Energy) -> Option<Cost> {
        self.cells[slot_index * self.n_buckets + state.as_index() / self.width]
    }

    /// Lowest and highest state of the bucket.
    fn states(&self, bucket: usize) -> (Energy, Energy) {
        let lowest = Energy::from_index(bucket * self.width);
        let highest = Energy::from_index((bucket + 1) * self.width - 1).min(self.capacity);
        (lowest, highest)
    }

    /// Cheapest move from the bucket, followed by the cheapest bucket it may land in.
    fn relax(&self, moves: &SlotMoves, next_slot_index: usize, bucket: usize) -> Option<Cost> {
        let (lowest, highest) = self.states(bucket);
        let idle = moves
            .idle
            .and_then(|cost| Some(cost + self.min_within(next_slot_index, lowest, highest)?));
        let charge = moves.charge.iter().filter_map(|range| {
            let lowest_after = lowest + range.min_shift;
            if lowest_after > self.capacity {
                return None;
            }
            let highest_after = (highest + range.max_shift).min(self.capacity);
            Some(range.cost + self.min_within(next_slot_index, lowest_after, highest_after)?)
        });
        let discharge = moves.discharge.iter().filter_map(|range| {
            if range.min_shift > highest {
                return None;
            }
            let lowest_after = (lowest - range.max_shift).max(Energy::ZERO);
            let highest_after = highest - range.min_shift;
            Some(range.cost + self.min_within(next_slot_index, lowest_after, highest_after)?)
        });
        idle.into_iter().chain(charge).chain(discharge).min()
    }

    fn min_within(&self, slot_index: usize, lowest: Energy, highest: Energy) -> Option<Cost> {
        let row = &self.cells[slot_index * self.n_buckets..][..self.n_buckets];
        row[lowest.as_index() / self.width..=highest.as_index() / self.width]
            .iter()
            .flatten()
            .copied()
            .min()
    }
}

/// Feasible moves of a single slot, regardless of the state.
struct SlotMoves {
    idle: Option<Cost>,

    /// Stored energy ranges.
    charge: Vec<Move>,

    /// Taken energy ranges.
    discharge: Vec<Move>,
}

#[derive(Copy, Clone)]
struct Move {
    min_shift: Energy,
    max_shift: Energy,

    /// Cheapest cost within the range.
    cost: Cost,
}

impl SlotMoves {
    /// Charging is evaluated from the empty storage and discharging from the full one,
    /// so that only the rates and the grid limits may rule an amount out.
    fn new(problem: &Problem, slot_index: usize, width: usize) -> Self {
        let site = problem.site();
        let cost_of = |state, action| {
            problem.transition(slot_index, state, action).ok().map(|transition| transition.cost)
        };
        let max_charge = site.max_charge_rate.min(problem.max_charge_amount(Energy::ZERO));
        let charge = group(width, max_charge, |amount| {
            let cost = cost_of(Energy::ZERO, Action::Charge(amount))?;
            Some((site.charge_efficiency.apply(amount), cost))
        });
        let max_discharge = site.max_discharge_rate.min(site.capacity);
        let discharge = group(width, max_discharge, |amount| {
            Some((amount, cost_of(site.capacity, Action::Discharge(amount))?))
        });
        Self { idle: cost_of(Energy::ZERO, Action::Idle), charge, discharge }
    }
}

/// Group the feasible amounts `1..=limit` into ranges of `width` consecutive amounts.
fn group(
    width: usize,
    limit: Energy,
    shift_and_cost: impl Fn(Energy) -> Option<(Energy, Cost)>,
) -> Vec<Move> {
    let width = i64::try_from(width).unwrap_or(i64::MAX);
    let mut moves: Vec<Move> = Vec::new();
    let mut last_range = None;
    for amount in 1..=limit.0 {
        let Some((shift, cost)) = shift_and_cost(Energy(amount)) else {
            continue;
        };
        let range = (amount - 1) / width;
        match moves.last_mut() {
            Some(last) if last_range == Some(range) => {
                last.min_shift = last.min_shift.min(shift);
                last.max_shift = last.max_shift.max(shift);
                last.cost = last.cost.min(cost);
            }
            _ => {
                moves.push(Move { min_shift: shift, max_shift: shift, cost });
                last_range = Some(range);
            }
        }
    }
    moves
}
