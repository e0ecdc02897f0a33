//! Engine errors.
//!
//! Infeasibility and early stops are not errors, see [`crate::core::solver::Outcome`].

use thiserror::Error;

use crate::quantity::{energy::Energy, percent::Percent};

/// Malformed site configuration or slot sequence, detected before solving starts.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("capacity must not be negative, got {0}")]
    NegativeCapacity(Energy),

    #[error("{name} must not be negative, got {value}")]
    NegativeRate { name: &'static str, value: Energy },

    #[error("{name} must be within 1..=100, got {value}")]
    InvalidEfficiency { name: &'static str, value: Percent },

    #[error("horizon must be positive")]
    EmptyHorizon,

    #[error("horizon is {horizon} slots, but {n_slots} slots are provided")]
    HorizonMismatch { horizon: usize, n_slots: usize },

    #[error("slot #{slot}: {name} must not be negative, got {value}")]
    NegativeForecast { slot: usize, name: &'static str, value: Energy },

    #[error("slot #{slot}: feed-in tariff requires the export price")]
    MissingExportPrice { slot: usize },

    #[error("initial state {initial_state} is outside of [0, {capacity}]")]
    InitialStateOutOfBounds { initial_state: Energy, capacity: Energy },

    #[error("action step must be positive, got {0}")]
    InvalidActionStep(Energy),

    #[error("{name} must not be negative, got {value}")]
    NegativeGridLimit { name: &'static str, value: Energy },

    #[error("minimum final state {min_final_state} exceeds the capacity {capacity}")]
    FinalStateAboveCapacity { min_final_state: Energy, capacity: Energy },

    #[error("no actions are allowed")]
    NoActionsAllowed,
}

/// Schedule that violates the model invariants, which is an engine defect.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("slot #{slot} (state {state}): {reason}")]
pub struct InvariantViolation {
    /// 1-based slot number, `0` for the schedule as a whole.
    pub slot: usize,

    /// State before the offending slot.
    pub state: Energy,

    pub reason: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
