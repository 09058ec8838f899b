use std::ops::RangeInclusive;

use chrono::NaiveDate;

use crate::error::Error;
use crate::pricing::{BaseDistribution, ExclusionCondition, ExclusionRule, FactorRange, InsurerTable};
use crate::types::{InsurerId, Location, Month};

pub struct GeneratorConfig {
    pub seed: u64,
    pub records: usize,
    pub insurers: Vec<InsurerId>,
    pub vehicle_models: Vec<&'static str>,
    /// Earliest owner birthdate.
    pub birth_start: NaiveDate,
    /// Latest owner birthdate for a quote created today; shifted back by the
    /// quote's age so every owner is at least as old as on the reference date.
    pub birth_end: NaiveDate,
    /// Quotes are created up to this many days before the reference date.
    pub window_days: u32,
    pub production_years: RangeInclusive<i32>,
    pub power_kw: RangeInclusive<u32>,
    pub locations: Vec<Location>,
}

impl GeneratorConfig {
    pub fn canonical() -> Self {
        GeneratorConfig {
            seed: 42,
            records: 50_000,
            insurers: (0..10).map(InsurerId).collect(),
            vehicle_models: vec![
                "TOYOTA, COROLLA, 1.4 D-4D",
                "HONDA, CIVIC, 1.8 i-VTEC",
                "BMW, 3 Series, 320d",
                "VOLKSWAGEN, PASSAT, 2.0 TDI",
                "FORD, FOCUS, 1.6 TDCi",
                "AUDI, A4, 2.0 TDI",
                "MERCEDES-BENZ, E-Class, E220d",
                "RENAULT, CLIO, 0.9 TCE",
                "HYUNDAI, TUCSON, 1.6 GDi",
                "KIA, CEED, 1.0 T-GDi",
                "NISSAN, JUKE, 1.0 DIG-T",
                "SEAT, LEON, 1.5 TSI",
                "SKODA, KODIAQ, 2.0 TDI",
                "TOYOTA, RAV4, 2.0 D-4D",
                "VOLVO, S60, 2.0 T8",
                "PEUGEOT, 3008, 1.6 PureTech",
                "MERCEDES-BENZ, GLC, GLC220d",
                "BMW, 5 Series, 520d",
                "AUDI, Q5, 2.0 TDI",
                "VOLKSWAGEN, TIGUAN, 2.0 TDI",
                "LAND ROVER, DISCOVERY, 2.0 SD4",
            ],
            birth_start: date(1950, 1, 1),
            birth_end: date(2004, 12, 31),
            window_days: 4 * 365,
            production_years: 2000..=2022,
            power_kw: 50..=200,
            locations: Location::ALL.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |name: &str, low: f64, high: f64| Error::InvalidRange { name: name.to_string(), low, high };
        if self.birth_start > self.birth_end {
            return Err(Error::InvalidConfig(format!(
                "birth dates start on {} after they end on {}",
                self.birth_start, self.birth_end
            )));
        }
        if self.production_years.is_empty() {
            let (lo, hi) = (*self.production_years.start(), *self.production_years.end());
            return Err(invalid("production years", lo.into(), hi.into()));
        }
        if self.power_kw.is_empty() {
            let (lo, hi) = (*self.power_kw.start(), *self.power_kw.end());
            return Err(invalid("power kW", lo.into(), hi.into()));
        }
        if self.insurers.is_empty() || self.vehicle_models.is_empty() || self.locations.is_empty() {
            return Err(Error::InvalidConfig(
                "insurers, vehicle models and locations must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A set of months sharing one multiplier table.
pub struct SeasonRule {
    pub name: &'static str,
    pub months: Vec<Month>,
    pub factors: InsurerTable<FactorRange>,
}

pub struct PricingConfig {
    pub base: InsurerTable<BaseDistribution>,
    /// Mean price increase per 365 days since the start of the quote window.
    pub annual_drift: f64,
    /// Length of the trend window; the trend starts `trend_window_days` before the reference date.
    pub trend_window_days: i64,
    pub exclusions: Vec<ExclusionRule>,
    /// Probability that any insurer refuses a quote regardless of the risk.
    pub blanket_exclusion: f64,
    /// Owners aged at most this are young drivers.
    pub young_driver_max_age: i32,
    pub young_driver: InsurerTable<FactorRange>,
    /// Owners aged at least this are senior drivers.
    pub senior_driver_min_age: i32,
    pub senior_driver: InsurerTable<FactorRange>,
    pub new_car_max_age: i32,
    pub new_car: InsurerTable<FactorRange>,
    pub old_car_min_age: i32,
    pub old_car: InsurerTable<FactorRange>,
    pub locations: Vec<(Location, InsurerTable<FactorRange>)>,
    pub seasons: Vec<SeasonRule>,
}

impl PricingConfig {
    pub fn canonical() -> Self {
        let i = InsurerId;
        let r = FactorRange::new;

        PricingConfig {
            base: InsurerTable::new(BaseDistribution { starting_price: 145.0, std_dev: 40.0 })
                .with(i(1), BaseDistribution { starting_price: 150.0, std_dev: 20.0 })
                .with(i(5), BaseDistribution { starting_price: 145.0, std_dev: 30.0 }),
            annual_drift: 5.0,
            trend_window_days: 4 * 365,
            exclusions: vec![
                ExclusionRule { insurer: i(1), condition: ExclusionCondition::LocationIs(Location::Du), probability: 0.3 },
                ExclusionRule { insurer: i(6), condition: ExclusionCondition::OwnerYoungerThan(25), probability: 0.4 },
                ExclusionRule { insurer: i(3), condition: ExclusionCondition::VehicleOlderThan(10), probability: 0.2 },
            ],
            blanket_exclusion: 0.05,

            // ── Driver age ────────────────────────────────────────────────────
            young_driver_max_age: 25,
            young_driver: InsurerTable::new(r(1.2, 1.5))
                .with(i(2), r(1.1, 1.2))
                .with(i(4), r(1.3, 1.6))
                .with(i(6), r(1.3, 1.6)),
            senior_driver_min_age: 65,
            senior_driver: InsurerTable::new(r(1.3, 1.5))
                .with(i(8), r(1.1, 1.25))
                .with(i(0), r(1.4, 1.65)),

            // ── Vehicle age ───────────────────────────────────────────────────
            new_car_max_age: 5,
            new_car: InsurerTable::new(r(0.9, 1.0))
                .with(i(1), r(0.7, 0.9))
                .with(i(5), r(0.8, 0.9)),
            old_car_min_age: 10,
            old_car: InsurerTable::new(r(1.1, 1.3))
                .with(i(7), r(1.0, 1.4))
                .with(i(6), r(1.2, 1.4)),

            // ── Registration ──────────────────────────────────────────────────
            locations: vec![
                (
                    Location::Zg,
                    InsurerTable::new(r(1.1, 1.3)).with(i(4), r(1.2, 1.5)).with(i(9), r(1.3, 1.6)),
                ),
                (
                    Location::St,
                    InsurerTable::new(r(1.1, 1.3)).with(i(5), r(1.2, 1.5)).with(i(0), r(1.3, 1.65)),
                ),
            ],

            // ── Seasonality ───────────────────────────────────────────────────
            seasons: vec![
                SeasonRule {
                    name: "winter",
                    months: vec![Month(12), Month(1), Month(2)],
                    factors: InsurerTable::new(r(1.1, 1.3)).with(i(1), r(1.2, 1.4)).with(i(5), r(1.2, 1.5)),
                },
                SeasonRule {
                    name: "summer",
                    months: vec![Month(6), Month(7), Month(8)],
                    factors: InsurerTable::new(r(1.0, 1.1)).with(i(3), r(1.1, 1.2)).with(i(7), r(1.2, 1.3)),
                },
            ],
        }
    }

    /// Reject factor ranges the sampler cannot draw from and probabilities
    /// outside [0, 1].
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |name: &str, low: f64, high: f64| Error::InvalidRange { name: name.to_string(), low, high };

        for (name, b) in self.base.entries() {
            if !(b.starting_price > 0.0) || !(b.std_dev > 0.0) || !b.std_dev.is_finite() {
                return Err(invalid(&format!("base distribution of {name}"), b.starting_price, b.std_dev));
            }
        }
        let probabilities = self
            .exclusions
            .iter()
            .map(|e| e.probability)
            .chain(std::iter::once(self.blanket_exclusion));
        for p in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid("exclusion probability", p, p));
            }
        }

        let tables = [
            ("young driver", &self.young_driver),
            ("senior driver", &self.senior_driver),
            ("new car", &self.new_car),
            ("old car", &self.old_car),
        ]
        .into_iter()
        .map(|(n, t)| (n.to_string(), t))
        .chain(self.locations.iter().map(|(l, t)| (format!("location {l}"), t)))
        .chain(self.seasons.iter().map(|s| (format!("season {}", s.name), &s.factors)));

        for (table, factors) in tables {
            for (insurer, range) in factors.entries() {
                if !range.is_valid() {
                    return Err(invalid(&format!("{table} factor for {insurer}"), range.low, range.high));
                }
            }
        }
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    // Constant calendar dates.
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_configs_are_valid() {
        GeneratorConfig::canonical().validate().unwrap();
        PricingConfig::canonical().validate().unwrap();
    }

    #[test]
    fn canonical_generator_has_ten_insurers_and_full_catalog() {
        let config = GeneratorConfig::canonical();
        assert_eq!(config.insurers.len(), 10);
        assert_eq!(config.insurers[0].to_string(), "insurer0");
        assert_eq!(config.vehicle_models.len(), 21);
        assert_eq!(config.locations.len(), 4);
    }

    #[test]
    fn inverted_factor_range_is_rejected() {
        let mut config = PricingConfig::canonical();
        config.old_car = InsurerTable::new(FactorRange::new(1.3, 1.1));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }), "got {err:?}");
    }

    #[test]
    fn probability_above_one_is_rejected() {
        let mut config = PricingConfig::canonical();
        config.blanket_exclusion = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_production_years_are_rejected() {
        let mut config = GeneratorConfig::canonical();
        #[allow(clippy::reversed_empty_ranges)]
        {
            config.production_years = 2022..=2000;
        }
        assert!(config.validate().is_err());
    }
}
