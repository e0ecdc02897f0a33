use crate::{
    core::{
        error::ConfigError,
        site::{ExportPricing, SiteConfig},
        slot::Slot,
    },
    prelude::*,
    quantity::{Zero, energy::Energy},
};

/// Validated problem instance: the site, the slot sequence, and the initial state.
///
/// The site and the slots stay owned by the caller, the solver only reads them.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Problem<'a> {
    site: &'a SiteConfig,
    slots: &'a [Slot],
    initial_state: Energy,
}

impl<'a> Problem<'a> {
    /// Validate the inputs once, so that the solver never starts on a malformed model.
    #[instrument(skip_all, fields(horizon = site.horizon, initial_state = ?initial_state))]
    pub fn try_new(
        site: &'a SiteConfig,
        slots: &'a [Slot],
        initial_state: Energy,
    ) -> Result<Self, ConfigError> {
        Self::validate_site(site)?;

        if site.horizon == 0 {
            return Err(ConfigError::EmptyHorizon);
        }
        if site.horizon != slots.len() {
            return Err(ConfigError::HorizonMismatch {
                horizon: site.horizon,
                n_slots: slots.len(),
            });
        }
        for (index, slot) in slots.iter().enumerate() {
            Self::validate_slot(site, index + 1, slot)?;
        }

        if initial_state.is_negative() || initial_state > site.capacity {
            return Err(ConfigError::InitialStateOutOfBounds {
                initial_state,
                capacity: site.capacity,
            });
        }

        debug!(n_slots = slots.len(), "validated");
        Ok(Self { site, slots, initial_state })
    }

    fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
        if site.capacity.is_negative() {
            return Err(ConfigError::NegativeCapacity(site.capacity));
        }
        for (name, value) in [
            ("max_charge_rate", site.max_charge_rate),
            ("max_discharge_rate", site.max_discharge_rate),
        ] {
            if value.is_negative() {
                return Err(ConfigError::NegativeRate { name, value });
            }
        }
        for (name, value) in [
            ("charge_efficiency", site.charge_efficiency),
            ("discharge_efficiency", site.discharge_efficiency),
        ] {
            if !value.is_valid_efficiency() {
                return Err(ConfigError::InvalidEfficiency { name, value });
            }
        }
        for (name, limit) in
            [("max_grid_import", site.max_grid_import), ("max_grid_export", site.max_grid_export)]
        {
            if let Some(value) = limit
                && value.is_negative()
            {
                return Err(ConfigError::NegativeGridLimit { name, value });
            }
        }
        if site.action_step <= Energy::ZERO {
            return Err(ConfigError::InvalidActionStep(site.action_step));
        }
        if site.min_final_state > site.capacity {
            return Err(ConfigError::FinalStateAboveCapacity {
                min_final_state: site.min_final_state,
                capacity: site.capacity,
            });
        }
        if site.allowed_actions.is_empty() {
            return Err(ConfigError::NoActionsAllowed);
        }
        Ok(())
    }

    fn validate_slot(site: &SiteConfig, number: usize, slot: &Slot) -> Result<(), ConfigError> {
        for (name, value) in [("production", slot.production), ("consumption", slot.consumption)]
        {
            if value.is_negative() {
                return Err(ConfigError::NegativeForecast { slot: number, name, value });
            }
        }
        if site.export_pricing == ExportPricing::FeedInTariff && slot.export_price.is_none() {
            return Err(ConfigError::MissingExportPrice { slot: number });
        }
        Ok(())
    }

    pub const fn site(&self) -> &'a SiteConfig {
        self.site
    }

    pub const fn slots(&self) -> &'a [Slot] {
        self.slots
    }

    pub const fn initial_state(&self) -> Energy {
        self.initial_state
    }

    pub const fn horizon(&self) -> usize {
        self.slots.len()
    }

    /// Check whether the state is acceptable after the last slot.
    pub fn is_final_state_allowed(&self, state: Energy) -> bool {
        state >= self.site.min_final_state
    }
}
