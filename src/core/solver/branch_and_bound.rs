//! Depth-first branch-and-bound with a state-aware bound and dominance pruning.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::atomic::{AtomicU64, Ordering},
};

use itertools::Itertools;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{
    core::{
        action::Action,
        problem::Problem,
        solver::{
            SearchStats,
            incumbent::Incumbent,
            state_bound::{MAX_BUCKETS, StateBound},
            stop::Watchdog,
        },
        transition::Transition,
    },
    prelude::*,
    quantity::{Zero, cost::Cost, energy::Energy},
};

#[instrument(skip_all)]
pub(super) fn solve(
    problem: &Problem,
    incumbent: &Incumbent,
    watchdog: &Watchdog,
) -> SearchStats {
    let Some(search) = Search::new(problem, incumbent, watchdog) else {
        debug!("final state is unreachable");
        return SearchStats { n_nodes: 0, n_candidates: 0, is_complete: true };
    };
    search.dive();
    search.explore_root();
    SearchStats {
        n_nodes: search.n_nodes.into_inner(),
        n_candidates: search.n_candidates.into_inner(),
        is_complete: !watchdog.is_stopped(),
    }
}

struct Search<'a> {
    problem: &'a Problem<'a>,
    incumbent: &'a Incumbent<'a>,
    watchdog: &'a Watchdog<'a>,
    bound: StateBound,
    visits: Visits,
    n_nodes: AtomicU64,
    n_candidates: AtomicU64,
}

/// Transition together with the lower bound on the cost from its slot onwards.
struct Child {
    transition: Transition,
    lower_bound: Cost,
}

impl<'a> Search<'a> {
    /// # Returns
    ///
    /// [`None`], if no schedule may reach the final state.
    fn new(
        problem: &'a Problem<'a>,
        incumbent: &'a Incumbent<'a>,
        watchdog: &'a Watchdog<'a>,
    ) -> Option<Self> {
        let bound = StateBound::new(problem, MAX_BUCKETS);
        bound.get(0, problem.initial_state())?;
        Some(Self {
            problem,
            incumbent,
            watchdog,
            bound,
            visits: Visits::default(),
            n_nodes: AtomicU64::new(0),
            n_candidates: AtomicU64::new(0),
        })
    }

    /// Descend along the most promising children to seed the incumbent before the search.
    ///
    /// The descent is not counted towards the explored nodes.
    fn dive(&self) {
        if self.watchdog.should_stop(0) {
            return;
        }
        let mut state = self.problem.initial_state();
        let mut cost = Cost::ZERO;
        let mut actions = Vec::with_capacity(self.problem.horizon());
        for slot_index in 0..self.problem.horizon() {
            let Some(child) = self.children(slot_index, state).into_iter().next() else {
                trace!(slot = slot_index + 1, "dive got stuck");
                return;
            };
            actions.push(child.transition.action);
            state = child.transition.state_after;
            cost += child.transition.cost;
        }
        if self.problem.is_final_state_allowed(state) {
            debug!(%cost, "dive succeeded");
            self.incumbent.offer(cost, &actions);
        }
    }

    /// The root branches are explored in parallel, and each branch sequentially.
    fn explore_root(&self) {
        let initial_state = self.problem.initial_state();
        if let Some(children) = self.expand(0, initial_state, Cost::ZERO, &[]) {
            children.par_iter().for_each(|child| {
                if child.lower_bound > self.incumbent.cost() {
                    return;
                }
                let mut prefix = Vec::with_capacity(self.problem.horizon());
                prefix.push(child.transition.action);
                self.explore(1, child.transition.state_after, child.transition.cost, &mut prefix);
            });
        }
    }

    fn explore(&self, slot_index: usize, state: Energy, cost: Cost, prefix: &mut Vec<Action>) {
        let Some(children) = self.expand(slot_index, state, cost, prefix) else {
            return;
        };
        for child in children {
            // Children are sorted by the bound, so the rest cannot do any better:
            if cost + child.lower_bound > self.incumbent.cost() {
                break;
            }
            prefix.push(child.transition.action);
            let Transition { state_after, cost: transition_cost, .. } = child.transition;
            self.explore(slot_index + 1, state_after, cost + transition_cost, prefix);
            prefix.pop();
        }
    }

    /// Visit the node and list its children.
    ///
    /// Complete schedules are offered to the incumbent.
    ///
    /// # Returns
    ///
    /// [`None`], if the node is a leaf or pruned.
    fn expand(
        &self,
        slot_index: usize,
        state: Energy,
        cost: Cost,
        prefix: &[Action],
    ) -> Option<Vec<Child>> {
        let n_nodes = self.n_nodes.fetch_add(1, Ordering::Relaxed);
        if self.watchdog.should_stop(n_nodes) {
            return None;
        }
        if slot_index == self.problem.horizon() {
            if self.problem.is_final_state_allowed(state) {
                self.incumbent.offer(cost, prefix);
            }
            return None;
        }
        let cost_to_go = self.bound.get(slot_index, state)?;
        if !self.incumbent.may_be_beaten_by(cost + cost_to_go, prefix)
            || !self.visits.visit(slot_index, state, cost, prefix)
        {
            return None;
        }
        Some(self.children(slot_index, state))
    }

    /// Feasible children that may still reach the final state, most promising first.
    ///
    /// Equal bounds are ordered by the action, so that the dive follows the tie-break.
    fn children(&self, slot_index: usize, state: Energy) -> Vec<Child> {
        let candidates = self.problem.candidates(slot_index, state).collect_vec();
        self.n_candidates.fetch_add(candidates.len() as u64, Ordering::Relaxed);
        let mut children = candidates
            .into_iter()
            .filter_map(|transition| {
                let cost_to_go = self.bound.get(slot_index + 1, transition.state_after)?;
                Some(Child { transition, lower_bound: transition.cost + cost_to_go })
            })
            .collect_vec();
        children.sort_unstable_by_key(|child| (child.lower_bound, child.transition.action));
        children
    }
}

const N_SHARDS: usize = 64;

/// Best known prefix per visited slot and state.
///
/// A node is dominated when another prefix has reached the same state in the same slot
/// with a lower cost, or with the same cost and lexicographically smaller actions.
/// Only the visited nodes are stored, sharded by the slot and the state.
struct Visits {
    shards: Vec<Mutex<HashMap<(usize, Energy), Visit>>>,
}

struct Visit {
    cost: Cost,
    prefix: Box<[Action]>,
}

impl Default for Visits {
    fn default() -> Self {
        Self { shards: (0..N_SHARDS).map(|_| Mutex::default()).collect() }
    }
}

impl Visits {
    /// Record the visit.
    ///
    /// # Returns
    ///
    /// Whether the node is not dominated and must be expanded.
    fn visit(&self, slot_index: usize, state: Energy, cost: Cost, prefix: &[Action]) -> bool {
        let shard = slot_index.wrapping_mul(31).wrapping_add(state.as_index()) % N_SHARDS;
        let mut shard = self.shards[shard].lock();
        let visit = Visit { cost, prefix: prefix.into() };
        match shard.entry((slot_index, state)) {
            Entry::Occupied(mut entry) => {
                if (entry.get().cost, &*entry.get().prefix) <= (cost, prefix) {
                    return false;
                }
                entry.insert(visit);
            }
            Entry::Vacant(entry) => {
                entry.insert(visit);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        problem::tests::{site, slot},
        solver::stop::StopCondition,
    };

    #[test]
    fn dominated_visit() {
        let visits = Visits::default();
        let charge = [Action::Charge(Energy(2))];
        let discharge = [Action::Discharge(Energy(2))];
        assert!(visits.visit(1, Energy(5), Cost(20), &discharge));
        assert!(!visits.visit(1, Energy(5), Cost(21), &charge));
        assert!(visits.visit(1, Energy(5), Cost(20), &charge));
        assert!(!visits.visit(1, Energy(5), Cost(20), &discharge));
        assert!(visits.visit(1, Energy(4), Cost(30), &discharge));
        assert!(visits.visit(2, Energy(5), Cost(30), &discharge));
    }

    /// Verify that the dive alone finds the optimum when the bound is exact.
    #[test]
    fn dive_follows_exact_bound() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(100, 0, 50)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let incumbent = Incumbent::new(&());
        let condition = StopCondition::default();
        let watchdog = Watchdog::start(&condition);
        let search = Search::new(&problem, &incumbent, &watchdog).unwrap();

        let root_children = search.children(0, Energy(0));
        assert_eq!(root_children[0].transition.action, Action::Charge(Energy(50)));
        assert_eq!(root_children[0].lower_bound, Cost(1500));
        assert!(
            root_children
                .iter()
                .tuple_windows()
                .all(|(lhs, rhs)| lhs.lower_bound <= rhs.lower_bound)
        );

        search.dive();
        assert_eq!(search.n_nodes.load(Ordering::Relaxed), 0);
        drop(search);
        let (best, n_improvements) = incumbent.into_inner();
        let best = best.unwrap();
        assert_eq!(best.cost, Cost(1500));
        assert_eq!(best.actions, [Action::Charge(Energy(50)), Action::Discharge(Energy(45))]);
        assert_eq!(n_improvements, 1);
    }

    #[test]
    fn stopped_dive_offers_nothing() {
        let site = site(100, 2);
        let slots = [slot(10, 0, 0), slot(100, 0, 50)];
        let problem = Problem::try_new(&site, &slots, Energy(0)).unwrap();
        let incumbent = Incumbent::new(&());
        let condition = StopCondition::builder().node_limit(0).build();
        let watchdog = Watchdog::start(&condition);
        Search::new(&problem, &incumbent, &watchdog).unwrap().dive();
        assert!(incumbent.into_inner().0.is_none());
    }
}
