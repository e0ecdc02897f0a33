use std::iter::once;

use serde::Serialize;
use thiserror::Error;

use crate::{
    core::{
        action::{Action, ActionKind},
        problem::Problem,
        slot::Slot,
    },
    quantity::{Zero, cost::Cost, energy::Energy, price::Price},
};

/// Single-slot transition record.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Transition {
    /// 1-based slot number.
    pub slot: usize,

    pub state_before: Energy,
    pub action: Action,
    pub state_after: Energy,

    /// Net grid exchange: positive is import, negative is export.
    pub grid_exchange: Energy,

    pub price: Price,
    pub cost: Cost,
}

/// Reason why an action cannot be applied in a given state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Infeasibility {
    #[error("{0} is not allowed")]
    Disabled(ActionKind),

    #[error("amount {amount} is outside of (0, {limit}]")]
    RateLimit { amount: Energy, limit: Energy },

    #[error("storing {stored} on top of {state} overflows the capacity {capacity}")]
    Overflow { state: Energy, stored: Energy, capacity: Energy },

    #[error("taking {amount} exceeds the stored {state}")]
    Underflow { state: Energy, amount: Energy },

    #[error("grid import {import} exceeds the limit {limit}")]
    ImportLimit { import: Energy, limit: Energy },

    #[error("grid export {export} exceeds the limit {limit}")]
    ExportLimit { export: Energy, limit: Energy },
}

impl Problem<'_> {
    /// Apply the action to the state at the given 0-based slot index.
    ///
    /// All arithmetic is integer, and the efficiency losses are floored:
    ///
    /// - charging stores `floor(amount × charge_efficiency / 100)`,
    ///   while the grid supplies the full amount;
    /// - discharging takes the full amount from the storage,
    ///   while the household and the grid receive `floor(amount × discharge_efficiency / 100)`.
    pub fn transition(
        &self,
        slot_index: usize,
        state_before: Energy,
        action: Action,
    ) -> Result<Transition, Infeasibility> {
        let site = self.site();
        let slot = &self.slots()[slot_index];

        if !site.allowed_actions.contains(action.kind()) {
            return Err(Infeasibility::Disabled(action.kind()));
        }

        let (state_after, battery_exchange) = match action {
            Action::Idle => (state_before, Energy::ZERO),
            Action::Charge(amount) => {
                Self::check_rate(amount, site.max_charge_rate)?;
                let stored = site.charge_efficiency.apply(amount);
                let state_after = state_before + stored;
                if state_after > site.capacity {
                    return Err(Infeasibility::Overflow {
                        state: state_before,
                        stored,
                        capacity: site.capacity,
                    });
                }
                (state_after, amount)
            }
            Action::Discharge(amount) => {
                Self::check_rate(amount, site.max_discharge_rate)?;
                if amount > state_before {
                    return Err(Infeasibility::Underflow { state: state_before, amount });
                }
                (state_before - amount, -site.discharge_efficiency.apply(amount))
            }
        };

        let grid_exchange = slot.net_demand() + battery_exchange;
        let (import, export) = grid_exchange.split();
        if let Some(limit) = site.max_grid_import
            && import > limit
        {
            return Err(Infeasibility::ImportLimit { import, limit });
        }
        if let Some(limit) = site.max_grid_export
            && export > limit
        {
            return Err(Infeasibility::ExportLimit { export, limit });
        }

        Ok(Transition {
            slot: slot_index + 1,
            state_before,
            action,
            state_after,
            grid_exchange,
            price: slot.price,
            cost: self.cost(slot, grid_exchange),
        })
    }

    const fn check_rate(amount: Energy, limit: Energy) -> Result<(), Infeasibility> {
        if amount.0 <= 0 || amount.0 > limit.0 {
            Err(Infeasibility::RateLimit { amount, limit })
        } else {
            Ok(())
        }
    }

    /// Calculate the grid exchange cost: import is paid, export is credited.
    pub fn cost(&self, slot: &Slot, grid_exchange: Energy) -> Cost {
        let (import, export) = grid_exchange.split();
        import * slot.price - export * self.site().export_pricing.export_price(slot)
    }

    /// Enumerate all feasible transitions from the state.
    ///
    /// The amounts are the multiples of the action step, plus the largest feasible amount
    /// so that the battery may always be filled up or drained completely.
    pub fn candidates(
        &self,
        slot_index: usize,
        state: Energy,
    ) -> impl Iterator<Item = Transition> + '_ {
        let site = self.site();
        let max_charge = site.max_charge_rate.min(self.max_charge_amount(state));
        let max_discharge = site.max_discharge_rate.min(state);
        once(Action::Idle)
            .chain(amounts(site.action_step, max_charge).map(Action::Charge))
            .chain(amounts(site.action_step, max_discharge).map(Action::Discharge))
            .filter_map(move |action| self.transition(slot_index, state, action).ok())
    }

    /// Largest grid-side charge amount that still fits into the remaining headroom.
    ///
    /// `floor(a × e / 100) ≤ h` holds exactly for `a ≤ (100 × (h + 1) − 1) / e`.
    pub fn max_charge_amount(&self, state: Energy) -> Energy {
        let headroom = self.site().capacity - state;
        if headroom.is_negative() {
            return Energy::ZERO;
        }
        let efficiency = i64::from(self.site().charge_efficiency.0);
        Energy((100 * (headroom.0 + 1) - 1) / efficiency)
    }
}

/// Multiples of the step up to the limit, followed by the limit itself when it is not a multiple.
fn amounts(step: Energy, limit: Energy) -> impl Iterator<Item = Energy> {
    let n_steps = if limit.0 > 0 { limit.0 / step.0 } else { 0 };
    let remainder = (limit.0 > 0 && limit.0 % step.0 != 0).then_some(limit);
    (1..=n_steps).map(move |n| Energy(n * step.0)).chain(remainder)
}
