use serde::Serialize;

use crate::{core::schedule::ScheduleResult, prelude::*, quantity::cost::Cost};

/// Improvement of the best known schedule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Improvement {
    pub cost: Cost,

    /// 1-based running index of the improvement within the solve.
    pub index: usize,
}

/// Progress subscription owned by the caller of the solver.
///
/// The callbacks are invoked synchronously from the solving threads. Improvements are reported
/// while the incumbent is locked, so every next improvement is strictly cheaper than the previous.
pub trait Subscriber: Sync {
    fn on_improvement(&self, _improvement: Improvement) {}

    fn on_complete(&self, _result: &ScheduleResult) {}
}

impl Subscriber for () {}

/// Logs the progress.
pub struct LogSubscriber;

impl Subscriber for LogSubscriber {
    fn on_improvement(&self, improvement: Improvement) {
        info!(index = improvement.index, cost = %improvement.cost, "found a better schedule");
    }

    fn on_complete(&self, result: &ScheduleResult) {
        info!(
            total_cost = %result.total_cost,
            is_optimal = result.is_optimal,
            n_nodes = result.diagnostics.nodes,
            elapsed = ?result.diagnostics.elapsed,
            "completed",
        );
    }
}
