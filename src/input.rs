//! Problem files: the site, the initial state, and the fine-grained forecast.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    core::{error::ConfigError, problem::Problem, site::SiteConfig, slot::Slot},
    prelude::*,
    quantity::{energy::Energy, price::Price},
};

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemFile {
    /// Stored energy at the start of the horizon.
    #[serde(default)]
    pub initial_state: Energy,

    pub site: SiteConfig,
    pub forecast: Forecast,
}

impl ProblemFile {
    /// Read the problem file, the format is chosen by the extension: `.toml` or `.json`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let file: Self = match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => toml::from_str(&contents).context("failed to parse the TOML")?,
            Some("json") => serde_json::from_str(&contents).context("failed to parse the JSON")?,
            _ => bail!("unsupported problem file extension, expected `.toml` or `.json`"),
        };
        debug!(n_points = file.forecast.points.len(), "read the problem file");
        Ok(file)
    }

    /// Aggregate the forecast into the slots.
    ///
    /// Missing horizon defaults to the number of the aggregated slots.
    pub fn into_instance(self) -> Result<Instance> {
        let slots = self.forecast.aggregate()?;
        let mut site = self.site;
        if site.horizon == 0 {
            site.horizon = slots.len();
        }
        Ok(Instance { site, slots, initial_state: self.initial_state })
    }
}

/// Owned inputs of the solver.
#[must_use]
#[derive(Clone, Debug)]
pub struct Instance {
    pub site: SiteConfig,
    pub slots: Vec<Slot>,
    pub initial_state: Energy,
}

impl Instance {
    pub fn problem(&self) -> Result<Problem<'_>, ConfigError> {
        Problem::try_new(&self.site, &self.slots, self.initial_state)
    }
}

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Forecast {
    /// Number of consecutive points which form a single slot, for example, 4 quarter-hours.
    #[serde(default = "default_points_per_slot")]
    pub points_per_slot: usize,

    /// Fractional prices get multiplied by the scale and rounded to the integer prices.
    #[serde(default = "default_price_scale")]
    pub price_scale: f64,

    pub points: Vec<ForecastPoint>,
}

const fn default_points_per_slot() -> usize {
    1
}

const fn default_price_scale() -> f64 {
    1.0
}

#[must_use]
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct ForecastPoint {
    pub price: f64,

    #[serde(default)]
    pub export_price: Option<f64>,

    /// Production behind the inverter AC side, for example, another inverter.
    #[serde(default)]
    pub production_ac: Energy,

    /// Production on the DC side, for example, solar panels on the hybrid inverter.
    #[serde(default)]
    pub production_dc: Energy,

    #[serde(default)]
    pub consumption: Energy,
}

impl Forecast {
    /// Down-sample the points into the slots: mean price, and summed energies.
    ///
    /// The trailing incomplete group is dropped.
    pub fn aggregate(&self) -> Result<Vec<Slot>> {
        ensure!(self.points_per_slot != 0, "points per slot must be positive");
        ensure!(
            self.price_scale.is_finite() && self.price_scale > 0.0,
            "price scale must be positive, got {}",
            self.price_scale,
        );

        let n_dropped = self.points.len() % self.points_per_slot;
        if n_dropped != 0 {
            warn!(n_dropped, "dropping the incomplete trailing slot");
        }

        self.points
            .chunks_exact(self.points_per_slot)
            .enumerate()
            .map(|(index, points)| {
                let prices = points
                    .iter()
                    .map(|point| self.scale(point.price))
                    .collect::<Result<Vec<_>>>()?;
                let export_prices = points
                    .iter()
                    .filter_map(|point| point.export_price)
                    .map(|price| self.scale(price))
                    .collect::<Result<Vec<_>>>()?;
                let export_price = match export_prices.len() {
                    0 => None,
                    n if n == points.len() => Some(mean(&export_prices)),
                    _ => bail!("slot #{}: export price is missing for some points", index + 1),
                };
                Ok(Slot {
                    price: mean(&prices),
                    export_price,
                    production: points
                        .iter()
                        .map(|point| point.production_ac + point.production_dc)
                        .sum(),
                    consumption: points.iter().map(|point| point.consumption).sum(),
                })
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn scale(&self, price: f64) -> Result<Price> {
        let scaled = (price * self.price_scale).round();
        ensure!(
            scaled.is_finite() && scaled.abs() < i64::MAX as f64,
            "price {price} is out of range after scaling",
        );
        Ok(Price(scaled as i64))
    }
}

/// Mean rounded half up.
#[allow(clippy::cast_possible_wrap)]
fn mean(prices: &[Price]) -> Price {
    let n = prices.len() as i64;
    let sum: i64 = prices.iter().map(|price| price.0).sum();
    Price((2 * sum + n).div_euclid(2 * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(price: f64, production: i64, consumption: i64) -> ForecastPoint {
        ForecastPoint {
            price,
            export_price: None,
            production_ac: Energy(production),
            production_dc: Energy::default(),
            consumption: Energy(consumption),
        }
    }

    #[test]
    fn aggregate_quarters() {
        let forecast = Forecast {
            points_per_slot: 4,
            price_scale: 100.0,
            points: vec![
                point(0.101, 1, 2),
                point(0.102, 1, 2),
                point(0.103, 1, 2),
                point(0.106, 1, 2),
                point(0.25, 0, 5),
                point(0.25, 0, 5),
                point(0.26, 0, 5),
                point(0.26, 0, 5),
                point(0.5, 0, 9),
            ],
        };
        let slots = forecast.aggregate().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].price, Price(10)); // (10 + 10 + 10 + 11) / 4
        assert_eq!(slots[0].production, Energy(4));
        assert_eq!(slots[0].consumption, Energy(8));
        assert_eq!(slots[1].price, Price(26)); // (25 + 25 + 26 + 26) / 4 = 25.5
        assert_eq!(slots[1].consumption, Energy(20));
        assert_eq!(slots[1].export_price, None);
    }

    #[test]
    fn ac_and_dc_production_are_summed() {
        let forecast = Forecast {
            points_per_slot: 1,
            price_scale: 1.0,
            points: vec![ForecastPoint { production_dc: Energy(7), ..point(3.0, 5, 0) }],
        };
        assert_eq!(forecast.aggregate().unwrap()[0].production, Energy(12));
    }

    #[test]
    fn negative_prices_round_half_up() {
        assert_eq!(mean(&[Price(-3), Price(-4)]), Price(-3));
        assert_eq!(mean(&[Price(-3), Price(-5)]), Price(-4));
    }

    #[test]
    fn partial_export_prices() {
        let forecast = Forecast {
            points_per_slot: 2,
            price_scale: 1.0,
            points: vec![
                ForecastPoint { export_price: Some(1.0), ..point(3.0, 0, 0) },
                point(3.0, 0, 0),
            ],
        };
        assert!(forecast.aggregate().is_err());
    }

    #[test]
    fn zero_points_per_slot() {
        let forecast = Forecast { points_per_slot: 0, price_scale: 1.0, points: vec![] };
        assert!(forecast.aggregate().is_err());
    }

    #[test]
    fn parse_toml() {
        let file: ProblemFile = toml::from_str(
            r#"
            initial_state = 10

            [site]
            capacity = 100
            max_charge_rate = 50
            max_discharge_rate = 50
            charge_efficiency = 90
            discharge_efficiency = 90
            export_pricing = { purchase-fee = 2 }
            allowed_actions = ["idle", "charge"]

            [forecast]
            points_per_slot = 2
            price_scale = 100.0
            points = [
                { price = 0.1, consumption = 3 },
                { price = 0.1, production_dc = 4 },
            ]
            "#,
        )
        .unwrap();
        let instance = file.into_instance().unwrap();
        assert_eq!(instance.site.horizon, 1);
        assert_eq!(instance.slots[0].price, Price(10));
        assert_eq!(instance.slots[0].net_demand(), Energy(-1));
        let problem = instance.problem().unwrap();
        assert_eq!(problem.initial_state(), Energy(10));
    }

    #[test]
    fn parse_json() {
        let file: ProblemFile = serde_json::from_str(
            r#"{
                "site": {
                    "capacity": 100,
                    "max_charge_rate": 50,
                    "max_discharge_rate": 50,
                    "charge_efficiency": 90,
                    "discharge_efficiency": 90,
                    "horizon": 2
                },
                "forecast": {"points": [{"price": 10}, {"price": 100, "consumption": 50}]}
            }"#,
        )
        .unwrap();
        let instance = file.into_instance().unwrap();
        assert_eq!(instance.initial_state, Energy(0));
        assert_eq!(instance.slots[1].price, Price(100));
        assert!(instance.problem().is_ok());
    }
}
