//! Backward dynamic programming over the integer states.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::{
    core::{
        problem::Problem,
        solver::{
            SearchStats,
            incumbent::Incumbent,
            solution_space::{Decision, SolutionSpace},
            stop::Watchdog,
        },
    },
    prelude::*,
    quantity::energy::Energy,
};

/// Fill in the solution space stage by stage, from the last slot to the first one.
///
/// Every stage is computed in parallel over the states, and only depends on the next stage,
/// so the stages are separated by the collection barrier.
#[instrument(skip_all)]
pub(super) fn solve(
    problem: &Problem,
    incumbent: &Incumbent,
    watchdog: &Watchdog,
) -> SearchStats {
    let site = problem.site();
    let mut space = SolutionSpace::new(problem.horizon(), site.capacity, site.min_final_state);
    let n_states = space.n_states();
    let mut n_nodes = 0_u64;
    let n_candidates = AtomicU64::new(0);

    for slot_index in (0..problem.horizon()).rev() {
        if watchdog.should_stop(n_nodes) {
            return SearchStats {
                n_nodes,
                n_candidates: n_candidates.into_inner(),
                is_complete: false,
            };
        }
        let row: Vec<Option<Decision>> = (0..n_states)
            .into_par_iter()
            .map(|state| {
                let mut n_evaluated = 0;
                let decision = problem
                    .candidates(slot_index, Energy::from_index(state))
                    .inspect(|_| n_evaluated += 1)
                    .filter_map(|transition| {
                        let cost_to_go = space.cost_to_go(slot_index + 1, transition.state_after)?
                            + transition.cost;
                        Some(Decision {
                            cost_to_go,
                            action: transition.action,
                            state_after: transition.state_after,
                        })
                    })
                    .min_by_key(|decision| (decision.cost_to_go, decision.action));
                n_candidates.fetch_add(n_evaluated, Ordering::Relaxed);
                decision
            })
            .collect();
        space.row_mut(slot_index).copy_from_slice(&row);
        n_nodes += n_states as u64;
        trace!(slot = slot_index + 1, "stage done");
    }

    match space.backtrack(problem.initial_state()) {
        Some((cost, actions)) => {
            incumbent.offer(cost, &actions);
        }
        None => {
            debug!("no feasible schedule from the initial state");
        }
    }
    SearchStats { n_nodes, n_candidates: n_candidates.into_inner(), is_complete: true }
}
