mod branch_and_bound;
mod dynamic;
mod incumbent;
mod solution_space;
mod state_bound;
pub mod stop;
pub mod subscriber;

use std::time::Instant;

use bon::Builder;
use rayon::ThreadPoolBuilder;
use serde::Serialize;

pub use self::{
    stop::StopCondition,
    subscriber::{Improvement, LogSubscriber, Subscriber},
};
use crate::{
    core::{
        action::Action,
        error::Error,
        problem::Problem,
        schedule::{Diagnostics, ScheduleResult},
        solver::{incumbent::Incumbent, stop::Watchdog},
    },
    prelude::*,
    quantity::cost::Cost,
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Backward dynamic programming over the integer states.
    #[default]
    #[value(name = "dp")]
    DynamicProgramming,

    /// Depth-first branch-and-bound, anytime.
    BranchAndBound,
}

#[must_use]
#[derive(Debug)]
pub enum Outcome {
    /// Optimal schedule, or the best one found before the stop condition.
    Scheduled(ScheduleResult),

    /// No schedule satisfies the constraints.
    Infeasible,

    /// The solver has been stopped before it found any feasible schedule.
    Interrupted,
}

impl Outcome {
    pub fn into_result(self) -> Option<ScheduleResult> {
        match self {
            Self::Scheduled(result) => Some(result),
            Self::Infeasible | Self::Interrupted => None,
        }
    }
}

/// Statistics of a single strategy run.
struct SearchStats {
    n_nodes: u64,
    n_candidates: u64,

    /// Whether the search space has been exhausted without being stopped.
    is_complete: bool,
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Solver<'a> {
    problem: &'a Problem<'a>,

    #[builder(default)]
    strategy: Strategy,

    /// Number of worker threads, zero stands for the number of logical CPUs.
    #[builder(default)]
    threads: usize,

    #[builder(default)]
    stop: StopCondition,

    subscriber: Option<&'a dyn Subscriber>,
}

impl<S: solver_builder::IsComplete> SolverBuilder<'_, S> {
    /// Find the optimal battery schedule.
    ///
    /// # Errors
    ///
    /// Failure to start the worker pool, or an invariant violation in the produced schedule.
    pub fn solve(self) -> Result<Outcome, Error> {
        self.build().solve()
    }
}

impl Solver<'_> {
    #[instrument(
        skip_all,
        name = "solving…",
        fields(strategy = ?self.strategy, horizon = self.problem.horizon()),
    )]
    fn solve(self) -> Result<Outcome, Error> {
        let start_time = Instant::now();
        let pool = ThreadPoolBuilder::new().num_threads(self.threads).build()?;
        let subscriber = self.subscriber.unwrap_or(&());
        let incumbent = Incumbent::new(subscriber);
        let watchdog = Watchdog::start(&self.stop);

        let baseline = self.baseline();
        if let Some((cost, actions)) = &baseline {
            debug!(%cost, "all-idle schedule is feasible");
            incumbent.offer(*cost, actions);
        }

        let stats = pool.install(|| match self.strategy {
            Strategy::DynamicProgramming => dynamic::solve(self.problem, &incumbent, &watchdog),
            Strategy::BranchAndBound => {
                branch_and_bound::solve(self.problem, &incumbent, &watchdog)
            }
        });

        let (best, n_improvements) = incumbent.into_inner();
        let Some(best) = best else {
            return if stats.is_complete {
                info!(n_nodes = stats.n_nodes, "infeasible");
                Ok(Outcome::Infeasible)
            } else {
                info!(n_nodes = stats.n_nodes, "interrupted");
                Ok(Outcome::Interrupted)
            };
        };

        let diagnostics = Diagnostics {
            strategy: self.strategy,
            nodes: stats.n_nodes,
            candidates: stats.n_candidates,
            improvements: n_improvements,
            elapsed: start_time.elapsed(),
        };
        let result = ScheduleResult::extract(
            self.problem,
            &best.actions,
            best.cost,
            stats.is_complete,
            baseline.map(|(cost, _)| cost),
            diagnostics,
        )
        .inspect_err(|violation| {
            error!(
                slot = violation.slot,
                state = %violation.state,
                reason = %violation.reason,
                "invalid schedule",
            );
        })?;
        info!(
            total_cost = %result.total_cost,
            is_optimal = result.is_optimal,
            elapsed = ?diagnostics.elapsed,
            "solved",
        );
        subscriber.on_complete(&result);
        Ok(Outcome::Scheduled(result))
    }

    /// All-idle schedule with its cost, if it is feasible.
    fn baseline(&self) -> Option<(Cost, Vec<Action>)> {
        let initial_state = self.problem.initial_state();
        if !self.problem.is_final_state_allowed(initial_state) {
            return None;
        }
        let cost = (0..self.problem.horizon())
            .map(|slot_index| {
                self.problem.transition(slot_index, initial_state, Action::Idle).ok().map(
                    |transition| transition.cost,
                )
            })
            .sum::<Option<Cost>>()?;
        Some((cost, vec![Action::Idle; self.problem.horizon()]))
    }
}
