use std::time::Duration;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    core::{
        action::Action,
        error::InvariantViolation,
        problem::Problem,
        solver::Strategy,
        transition::Transition,
    },
    quantity::{Zero, cost::Cost, energy::Energy},
};

/// Final, validated solver result.
#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct ScheduleResult {
    /// One transition per slot, in order.
    pub schedule: Vec<Transition>,

    pub total_cost: Cost,

    /// Cost of the all-idle schedule, if it is feasible.
    pub baseline_cost: Option<Cost>,

    /// Whether no cheaper schedule may exist.
    pub is_optimal: bool,

    pub diagnostics: Diagnostics,
}

/// Solver statistics.
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Diagnostics {
    pub strategy: Strategy,

    /// Search nodes or state cells explored.
    pub nodes: u64,

    /// Transitions evaluated.
    pub candidates: u64,

    /// Number of reported improvements.
    pub improvements: usize,

    pub elapsed: Duration,
}

impl ScheduleResult {
    /// Replay the actions through the transition function and validate the resulting schedule.
    ///
    /// # Errors
    ///
    /// Any failure here means that the solver produced an invalid schedule.
    pub fn extract(
        problem: &Problem,
        actions: &[Action],
        expected_cost: Cost,
        is_optimal: bool,
        baseline_cost: Option<Cost>,
        diagnostics: Diagnostics,
    ) -> Result<Self, InvariantViolation> {
        if actions.len() != problem.horizon() {
            return Err(InvariantViolation {
                slot: 0,
                state: problem.initial_state(),
                reason: format!(
                    "schedule has {} actions for {} slots",
                    actions.len(),
                    problem.horizon()
                ),
            });
        }

        let mut state = problem.initial_state();
        let schedule: Vec<Transition> = actions
            .iter()
            .enumerate()
            .map(|(slot_index, action)| -> Result<Transition, InvariantViolation> {
                let transition = problem.transition(slot_index, state, *action).map_err(
                    |infeasibility| InvariantViolation {
                        slot: slot_index + 1,
                        state,
                        reason: infeasibility.to_string(),
                    },
                )?;
                state = transition.state_after;
                Ok(transition)
            })
            .try_collect()?;

        validate(problem, &schedule)?;

        let total_cost = schedule.iter().map(|transition| transition.cost).sum();
        if total_cost != expected_cost {
            return Err(InvariantViolation {
                slot: 0,
                state: problem.initial_state(),
                reason: format!("total cost {total_cost} differs from the expected {expected_cost}"),
            });
        }

        Ok(Self { schedule, total_cost, baseline_cost, is_optimal, diagnostics })
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.schedule.iter().map(|transition| transition.action)
    }

    /// Savings compared to the all-idle schedule.
    #[must_use]
    pub fn savings(&self) -> Option<Cost> {
        self.baseline_cost.map(|baseline_cost| baseline_cost - self.total_cost)
    }

    pub fn final_state(&self) -> Option<Energy> {
        self.schedule.last().map(|transition| transition.state_after)
    }
}

/// Check the schedule invariants independently of how the schedule was produced.
pub fn validate(problem: &Problem, schedule: &[Transition]) -> Result<(), InvariantViolation> {
    let site = problem.site();
    let mut expected_state = problem.initial_state();

    if schedule.len() != problem.horizon() {
        return Err(InvariantViolation {
            slot: 0,
            state: expected_state,
            reason: format!("schedule has {} records for {} slots", schedule.len(), problem.horizon()),
        });
    }

    for (slot_index, (transition, slot)) in schedule.iter().zip(problem.slots()).enumerate() {
        let violation = |reason: String| InvariantViolation {
            slot: slot_index + 1,
            state: transition.state_before,
            reason,
        };

        if transition.slot != slot_index + 1 {
            return Err(violation(format!("record is numbered #{}", transition.slot)));
        }
        if transition.state_before != expected_state {
            return Err(violation(format!(
                "state before is {}, but the previous state after is {expected_state}",
                transition.state_before,
            )));
        }
        if transition.state_after.is_negative() || transition.state_after > site.capacity {
            return Err(violation(format!(
                "state after {} is outside of [0, {}]",
                transition.state_after, site.capacity,
            )));
        }

        let (delta, battery_exchange, limit) = match transition.action {
            Action::Idle => (Energy::ZERO, Energy::ZERO, Energy::ZERO),
            Action::Charge(amount) => {
                (site.charge_efficiency.apply(amount), amount, site.max_charge_rate)
            }
            Action::Discharge(amount) => {
                (-amount, -site.discharge_efficiency.apply(amount), site.max_discharge_rate)
            }
        };
        if transition.action.amount() > limit {
            return Err(violation(format!(
                "{} exceeds the rate limit {limit}",
                transition.action
            )));
        }
        if transition.state_after != transition.state_before + delta {
            return Err(violation(format!(
                "state after {} does not match {} applied to {}",
                transition.state_after, transition.action, transition.state_before,
            )));
        }

        let expected_exchange = slot.consumption - slot.production + battery_exchange;
        if transition.grid_exchange != expected_exchange {
            return Err(violation(format!(
                "grid exchange {} breaks the energy balance, expected {expected_exchange}",
                transition.grid_exchange,
            )));
        }
        let expected_cost = problem.cost(slot, expected_exchange);
        if transition.cost != expected_cost {
            return Err(violation(format!(
                "cost {} differs from the expected {expected_cost}",
                transition.cost
            )));
        }

        expected_state = transition.state_after;
    }

    if !problem.is_final_state_allowed(expected_state) {
        return Err(InvariantViolation {
            slot: schedule.len(),
            state: expected_state,
            reason: format!("final state is below the reserve {}", site.min_final_state),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::problem::tests::{site, slot},
        quantity::price::Price,
    };

    fn diagnostics() -> Diagnostics {
        Diagnostics {
            strategy: Strategy::DynamicProgramming,
            nodes: 0,
            candidates: 0,
            improvements: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn extract_ok() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(100, 0, 50)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let result = ScheduleResult::extract(
            &problem,
            &[Action::Charge(Energy(50)), Action::Discharge(Energy(45))],
            Cost(1500),
            true,
            Some(Cost(5000)),
            diagnostics(),
        )
        .unwrap();
        assert_eq!(result.total_cost, Cost(1500));
        assert_eq!(result.savings(), Some(Cost(3500)));
        assert_eq!(result.final_state(), Some(Energy(0)));
    }

    #[test]
    fn extract_infeasible_action() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(100, 0, 50)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let violation = ScheduleResult::extract(
            &problem,
            &[Action::Idle, Action::Discharge(Energy(1))],
            Cost(5000),
            true,
            None,
            diagnostics(),
        )
        .unwrap_err();
        assert_eq!(violation.slot, 2);
        assert_eq!(violation.state, Energy(0));
    }

    #[test]
    fn extract_cost_mismatch() {
        let site = site(100, 1);
        let slots = [slot(10, 0, 5)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let violation =
            ScheduleResult::extract(&problem, &[Action::Idle], Cost(1), true, None, diagnostics())
                .unwrap_err();
        assert_eq!(violation.slot, 0);
    }

    #[test]
    fn extract_wrong_length() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(10, 0, 0)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        assert!(
            ScheduleResult::extract(&problem, &[Action::Idle], Cost(0), true, None, diagnostics())
                .is_err()
        );
    }

    #[test]
    fn validate_detects_broken_chain() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(10, 0, 0)];
        let problem = Problem::try_new(&site, &slots, Energy(10)).unwrap();
        let first = problem.transition(0, Energy(10), Action::Idle).unwrap();
        let second = problem.transition(1, Energy(20), Action::Idle).unwrap();
        let violation = validate(&problem, &[first, second]).unwrap_err();
        assert_eq!(violation.slot, 2);
        assert_eq!(violation.state, Energy(20));
    }

    #[test]
    fn validate_detects_energy_leak() {
        let site = site(100, 1);
        let slots = [slot(10, 0, 0)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let mut transition = problem.transition(0, Energy(0), Action::Charge(Energy(10))).unwrap();
        transition.state_after = Energy(10);
        assert!(validate(&problem, &[transition]).is_err());
    }

    #[test]
    fn validate_detects_wrong_cost() {
        let site = site(100, 1);
        let slots = [slot(10, 0, 3)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let mut transition = problem.transition(0, Energy(0), Action::Idle).unwrap();
        transition.price = Price(1);
        transition.cost = Cost(3);
        assert!(validate(&problem, &[transition]).is_err());
    }

    #[test]
    fn validate_detects_final_reserve() {
        let mut site = site(100, 1);
        site.min_final_state = Energy(20);
        let slots = [slot(10, 0, 0)];
        let problem = Problem::try_new(&site, &slots, Energy(30)).unwrap();
        let transition = problem.transition(0, Energy(30), Action::Discharge(Energy(20))).unwrap();
        let violation = validate(&problem, &[transition]).unwrap_err();
        assert_eq!(violation.state, Energy(10));
    }
}
