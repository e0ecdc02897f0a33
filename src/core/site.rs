use bon::Builder;
use enumset::EnumSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::{action::ActionKind, slot::Slot},
    quantity::{Zero, energy::Energy, percent::Percent, price::Price},
};

/// Immutable site configuration: the battery and its grid connection.
#[must_use]
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Storage capacity.
    pub capacity: Energy,

    /// Maximum energy drawn from the grid for charging within one slot.
    pub max_charge_rate: Energy,

    /// Maximum energy taken from the storage within one slot.
    pub max_discharge_rate: Energy,

    pub charge_efficiency: Percent,
    pub discharge_efficiency: Percent,

    /// Number of slots in the planning horizon.
    ///
    /// Problem files may omit it, and then it defaults to the number of aggregated slots.
    #[serde(default)]
    pub horizon: usize,

    #[builder(default)]
    #[serde(default)]
    pub export_pricing: ExportPricing,

    /// Grid connection limit for import within one slot.
    #[serde(default)]
    pub max_grid_import: Option<Energy>,

    /// Grid connection limit for export within one slot.
    #[serde(default)]
    pub max_grid_export: Option<Energy>,

    /// Minimum stored energy after the last slot.
    #[builder(default)]
    #[serde(default)]
    pub min_final_state: Energy,

    /// Granularity of the charge and discharge amounts.
    #[builder(default = Energy(1))]
    #[serde(default = "default_action_step")]
    pub action_step: Energy,

    /// Enabled action kinds.
    #[builder(default = EnumSet::all())]
    #[serde(default = "EnumSet::all")]
    pub allowed_actions: EnumSet<ActionKind>,
}

const fn default_action_step() -> Energy {
    Energy(1)
}

/// How exported energy is credited.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportPricing {
    /// Export earns the import price of the slot.
    #[default]
    SamePrice,

    /// Export earns the import price minus the fee («inkoopvergoeding»).
    PurchaseFee(Price),

    /// Export earns the separate per-slot feed-in tariff.
    FeedInTariff,
}

impl ExportPricing {
    pub fn export_price(self, slot: &Slot) -> Price {
        match self {
            Self::SamePrice => slot.price,
            Self::PurchaseFee(fee) => slot.price - fee,
            Self::FeedInTariff => slot.export_price.unwrap_or(Price::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> Slot {
        Slot::builder()
            .price(Price(100))
            .export_price(Price(7))
            .production(Energy::ZERO)
            .consumption(Energy::ZERO)
            .build()
    }

    #[test]
    fn export_price_same() {
        assert_eq!(ExportPricing::SamePrice.export_price(&slot()), Price(100));
    }

    #[test]
    fn export_price_purchase_fee() {
        assert_eq!(ExportPricing::PurchaseFee(Price(21)).export_price(&slot()), Price(79));
    }

    #[test]
    fn export_price_feed_in() {
        assert_eq!(ExportPricing::FeedInTariff.export_price(&slot()), Price(7));
    }

    #[test]
    fn builder_defaults() {
        let site = SiteConfig::builder()
            .capacity(Energy(100))
            .max_charge_rate(Energy(50))
            .max_discharge_rate(Energy(50))
            .charge_efficiency(Percent(90))
            .discharge_efficiency(Percent(90))
            .horizon(2)
            .build();
        assert_eq!(site.export_pricing, ExportPricing::SamePrice);
        assert_eq!(site.action_step, Energy(1));
        assert_eq!(site.allowed_actions, EnumSet::all());
        assert_eq!(site.max_grid_import, None);
    }
}
