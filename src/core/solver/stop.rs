use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use bon::Builder;

use crate::prelude::*;

/// Conditions to stop the solver before the optimality is proven.
///
/// The solver then returns the best schedule found so far, without the optimality flag.
#[must_use]
#[derive(Clone, Debug, Default, Builder)]
pub struct StopCondition {
    /// Wall-clock budget measured from the start of the solve.
    pub timeout: Option<Duration>,

    /// Maximum number of explored search nodes or state cells.
    pub node_limit: Option<u64>,

    /// Shared flag raised by the caller to cancel the solve.
    pub cancellation: Option<Arc<AtomicBool>>,
}

/// Running stop condition for a single solve.
pub struct Watchdog<'a> {
    condition: &'a StopCondition,
    deadline: Option<Instant>,

    /// Sticky flag, so that every worker unwinds once any of them has seen the stop condition.
    is_stopped: AtomicBool,
}

impl<'a> Watchdog<'a> {
    pub fn start(condition: &'a StopCondition) -> Self {
        Self {
            condition,
            deadline: condition.timeout.map(|timeout| Instant::now() + timeout),
            is_stopped: AtomicBool::new(false),
        }
    }

    /// Check the stop conditions given the number of nodes explored so far.
    pub fn should_stop(&self, n_nodes: u64) -> bool {
        if self.is_stopped.load(Ordering::Acquire) {
            return true;
        }
        let should_stop = self.condition.node_limit.is_some_and(|limit| n_nodes >= limit)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            || self
                .condition
                .cancellation
                .as_ref()
                .is_some_and(|cancellation| cancellation.load(Ordering::Acquire));
        if should_stop && !self.is_stopped.swap(true, Ordering::AcqRel) {
            info!(n_nodes, "stopping early");
        }
        should_stop
    }

    pub fn is_stopped(&self) -> bool {
        self.is_stopped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited() {
        let condition = StopCondition::default();
        assert!(!Watchdog::start(&condition).should_stop(u64::MAX));
    }

    #[test]
    fn node_limit() {
        let condition = StopCondition::builder().node_limit(10).build();
        let watchdog = Watchdog::start(&condition);
        assert!(!watchdog.should_stop(9));
        assert!(watchdog.should_stop(10));
        assert!(watchdog.is_stopped());
    }

    #[test]
    fn cancellation_is_sticky() {
        let cancellation = Arc::new(AtomicBool::new(false));
        let condition = StopCondition::builder().cancellation(Arc::clone(&cancellation)).build();
        let watchdog = Watchdog::start(&condition);
        assert!(!watchdog.should_stop(0));
        cancellation.store(true, Ordering::Release);
        assert!(watchdog.should_stop(0));
        cancellation.store(false, Ordering::Release);
        assert!(watchdog.should_stop(0));
    }

    #[test]
    fn zero_timeout() {
        let condition = StopCondition::builder().timeout(Duration::ZERO).build();
        assert!(Watchdog::start(&condition).should_stop(0));
    }
}
