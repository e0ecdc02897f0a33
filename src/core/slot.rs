use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::quantity::{energy::Energy, price::Price};

/// Forecast for a single slot of the horizon.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Builder, Serialize, Deserialize)]
pub struct Slot {
    /// Grid import price.
    pub price: Price,

    /// Feed-in tariff, only used with [`crate::core::site::ExportPricing::FeedInTariff`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_price: Option<Price>,

    pub production: Energy,
    pub consumption: Energy,
}

impl Slot {
    /// Net household demand: positive is deficit, negative is excess production.
    pub fn net_demand(&self) -> Energy {
        self.consumption - self.production
    }
}
