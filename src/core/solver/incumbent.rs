use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::{
    core::{
        action::Action,
        solver::subscriber::{Improvement, Subscriber},
    },
    quantity::cost::Cost,
};

/// Best complete schedule known so far.
#[derive(Clone, Debug)]
pub struct Best {
    pub cost: Cost,
    pub actions: Vec<Action>,
}

impl Best {
    /// Schedules are ordered by cost, and then lexicographically by the actions.
    fn is_beaten_by(&self, cost: Cost, actions: &[Action]) -> bool {
        (cost, actions) < (self.cost, self.actions.as_slice())
    }
}

struct State {
    best: Option<Best>,
    n_improvements: usize,
}

/// Incumbent shared between the workers.
///
/// The cost is mirrored into an atomic, so that the workers may read the pruning bound
/// without taking the lock. It is only written under the lock and published with release ordering.
pub struct Incumbent<'a> {
    state: Mutex<State>,
    cost: AtomicI64,
    subscriber: &'a dyn Subscriber,
}

impl<'a> Incumbent<'a> {
    pub fn new(subscriber: &'a dyn Subscriber) -> Self {
        Self {
            state: Mutex::new(State { best: None, n_improvements: 0 }),
            cost: AtomicI64::new(Cost::MAX.0),
            subscriber,
        }
    }

    /// Current best cost, or [`Cost::MAX`] when nothing is known yet.
    pub fn cost(&self) -> Cost {
        Cost(self.cost.load(Ordering::Acquire))
    }

    /// Offer a complete schedule.
    ///
    /// An equal-cost schedule with lexicographically smaller actions replaces the incumbent
    /// silently, only strictly cheaper schedules are reported to the subscriber.
    ///
    /// # Returns
    ///
    /// Whether the schedule has been accepted.
    pub fn offer(&self, cost: Cost, actions: &[Action]) -> bool {
        let mut state = self.state.lock();
        if state.best.as_ref().is_some_and(|best| !best.is_beaten_by(cost, actions)) {
            return false;
        }
        let is_cheaper = state.best.as_ref().is_none_or(|best| cost < best.cost);
        state.best = Some(Best { cost, actions: actions.to_vec() });
        self.cost.store(cost.0, Ordering::Release);
        if is_cheaper {
            state.n_improvements += 1;
            self.subscriber.on_improvement(Improvement { cost, index: state.n_improvements });
        }
        true
    }

    /// Check whether a partial schedule may still lead to a better complete one.
    pub fn may_be_beaten_by(&self, lower_bound: Cost, prefix: &[Action]) -> bool {
        let cost = self.cost();
        if lower_bound != cost {
            return lower_bound < cost;
        }
        // Equal bound: only a lexicographically smaller or equal prefix may win the tie.
        self.state
            .lock()
            .best
            .as_ref()
            .is_none_or(|best| prefix <= &best.actions[..prefix.len().min(best.actions.len())])
    }

    /// # Returns
    ///
    /// The best schedule and the number of reported improvements.
    pub fn into_inner(self) -> (Option<Best>, usize) {
        let state = self.state.into_inner();
        (state.best, state.n_improvements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::energy::Energy;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Improvement>>);

    impl Subscriber for Recorder {
        fn on_improvement(&self, improvement: Improvement) {
            self.0.lock().push(improvement);
        }
    }

    #[test]
    fn reports_strict_improvements_only() {
        let recorder = Recorder::default();
        let incumbent = Incumbent::new(&recorder);
        assert!(incumbent.offer(Cost(10), &[Action::Charge(Energy(1))]));
        assert!(!incumbent.offer(Cost(11), &[Action::Idle]));
        assert!(incumbent.offer(Cost(10), &[Action::Idle]));
        assert!(incumbent.offer(Cost(5), &[Action::Discharge(Energy(1))]));
        assert_eq!(incumbent.cost(), Cost(5));
        assert_eq!(
            *recorder.0.lock(),
            [Improvement { cost: Cost(10), index: 1 }, Improvement { cost: Cost(5), index: 2 }],
        );
        let (best, n_improvements) = incumbent.into_inner();
        assert_eq!(best.unwrap().actions, [Action::Discharge(Energy(1))]);
        assert_eq!(n_improvements, 2);
    }

    #[test]
    fn bound_check() {
        let incumbent = Incumbent::new(&());
        assert!(incumbent.may_be_beaten_by(Cost(1_000_000), &[]));
        incumbent.offer(Cost(10), &[Action::Charge(Energy(1)), Action::Idle]);
        assert!(incumbent.may_be_beaten_by(Cost(9), &[Action::Discharge(Energy(5))]));
        assert!(!incumbent.may_be_beaten_by(Cost(11), &[Action::Idle]));
        assert!(incumbent.may_be_beaten_by(Cost(10), &[Action::Idle]));
        assert!(!incumbent.may_be_beaten_by(Cost(10), &[Action::Discharge(Energy(1))]));
    }
}
