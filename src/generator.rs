use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeDelta};
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::error::Error;
use crate::pricing::{PricingModel, QuoteContext};
use crate::record::{InsurerPrice, Owner, QuoteRecord, Vehicle, age_on};
use crate::types::Month;

/// Produces synthetic quote records relative to a fixed reference date.
pub struct Generator<'a> {
    config: &'a GeneratorConfig,
    pricing: &'a PricingModel,
    today: NaiveDate,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a GeneratorConfig, pricing: &'a PricingModel, today: NaiveDate) -> Result<Self, Error> {
        config.validate()?;
        Ok(Generator { config, pricing, today })
    }

    /// Generate `n` records from `rng`.
    #[tracing::instrument(skip_all, fields(n = n))]
    pub fn generate(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<QuoteRecord>, Error> {
        let records = (0..n).map(|_| self.generate_record(&mut *rng)).collect::<Result<Vec<_>, _>>()?;
        let offered: usize = records.iter().map(|r| r.prices().len()).sum();
        let possible = n * self.config.insurers.len();
        tracing::info!(records = records.len(), offered, refused = possible - offered, "generated dataset");
        Ok(records)
    }

    /// One customer: creation date in the window, owner, vehicle,
    /// registration, then one quote attempt per insurer in catalog order.
    pub fn generate_record(&self, rng: &mut impl Rng) -> Result<QuoteRecord, Error> {
        let c = self.config;

        let days_ago = rng.random_range(0..=c.window_days);
        let created_on = self.today - Days::new(days_ago.into());

        let model = c.vehicle_models[rng.random_range(0..c.vehicle_models.len())];
        let power_kw = rng.random_range(c.power_kw.clone());
        let production_year = self.production_year(created_on, rng);
        let birth_date = self.birth_date(created_on, days_ago, rng);
        let location = c.locations[rng.random_range(0..c.locations.len())];

        let ctx = QuoteContext {
            owner_age: age_on(birth_date, created_on),
            vehicle_age: created_on.year() - production_year,
            location,
            month: Month(created_on.month()),
            trend_days: (created_on - self.trend_start()).num_days(),
        };

        let prices = c
            .insurers
            .iter()
            .filter_map(|&insurer_id| {
                self.pricing
                    .quote(insurer_id, &ctx, &mut *rng)
                    .map(|total_amount| InsurerPrice { insurer_id, total_amount })
            })
            .collect();

        QuoteRecord::new(
            created_on.and_time(NaiveTime::MIN),
            Owner { birth_date },
            Vehicle { model: model.to_string(), power_kw, production_year },
            location,
            prices,
        )
    }

    /// Uniform birthdate between the configured start and the configured end
    /// moved back by the quote's age, never after the quote itself.
    fn birth_date(&self, created_on: NaiveDate, days_ago: u32, rng: &mut impl Rng) -> NaiveDate {
        let start = self.config.birth_start;
        let end = (self.config.birth_end - Days::new(days_ago.into())).min(created_on).max(start);
        let span = (end - start).num_days();
        let offset = rng.random_range(0..=span);
        start + TimeDelta::days(offset)
    }

    /// Uniform over the configured years, never after the quote's year.
    fn production_year(&self, created_on: NaiveDate, rng: &mut impl Rng) -> i32 {
        let (first, last) = (*self.config.production_years.start(), *self.config.production_years.end());
        rng.random_range(first..=last.min(created_on.year()).max(first))
    }

    /// First day of the price trend window.
    pub fn trend_start(&self) -> NaiveDate {
        self.today - TimeDelta::days(self.pricing.config().trend_window_days)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::PricingConfig;
    use crate::types::{InsurerId, Location};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn generate(n: usize, seed: u64) -> Vec<QuoteRecord> {
        let config = GeneratorConfig::canonical();
        let pricing = PricingModel::new(PricingConfig::canonical()).unwrap();
        let generator = Generator::new(&config, &pricing, today()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        generator.generate(n, &mut rng).unwrap()
    }

    #[test]
    fn records_fall_inside_configured_ranges() {
        let config = GeneratorConfig::canonical();
        let window_start = today() - Days::new(config.window_days.into());
        for r in generate(2_000, 42) {
            let created = r.created_at().date();
            assert!(created >= window_start && created <= today(), "created {created}");
            assert!(config.production_years.contains(&r.vehicle().production_year));
            assert!(config.power_kw.contains(&r.vehicle().power_kw));
            assert!(config.vehicle_models.contains(&r.vehicle().model.as_str()));
            assert!(config.locations.contains(&r.location()));
            let birth = r.owner().birth_date;
            assert!(birth >= config.birth_start, "birth {birth}");
            let days_ago = (today() - created).num_days() as u64;
            let shifted_end = config.birth_end - Days::new(days_ago);
            assert!(birth <= shifted_end, "birth {birth} after shifted end {shifted_end}");
        }
    }

    #[test]
    fn owner_age_is_non_negative_and_consistent() {
        for r in generate(2_000, 7) {
            let age = r.owner_age();
            assert!(age >= 0);
            let birth = r.owner().birth_date;
            let created = r.created_at().date();
            let mut expected = created.year() - birth.year();
            if created.month() < birth.month() || (created.month() == birth.month() && created.day() < birth.day()) {
                expected -= 1;
            }
            assert_eq!(age, expected);
        }
    }

    #[test]
    fn each_insurer_priced_at_most_once_and_positive() {
        for r in generate(1_000, 3) {
            let mut seen = HashSet::new();
            for p in r.prices() {
                assert!(seen.insert(p.insurer_id), "duplicate {}", p.insurer_id);
                assert!(p.total_amount > 0.0);
            }
        }
    }

    #[test]
    fn same_seed_reproduces_dataset() {
        assert_eq!(generate(200, 11), generate(200, 11));
        assert_ne!(generate(200, 11), generate(200, 12));
    }

    #[test]
    fn insurer1_is_often_missing_in_du() {
        let records = generate(20_000, 42);
        let du: Vec<&QuoteRecord> = records.iter().filter(|r| r.location() == Location::Du).collect();
        let missing = du.iter().filter(|r| r.price_for(InsurerId(1)).is_none()).count();
        let rate = missing as f64 / du.len() as f64;
        assert!((rate - 0.335).abs() < 0.03, "insurer1 missing in DU at rate {rate:.3}");
    }

    #[test]
    fn all_locations_are_drawn() {
        let locations: HashSet<Location> = generate(500, 5).iter().map(|r| r.location()).collect();
        assert_eq!(locations.len(), 4);
    }

    #[test]
    fn birth_dates_never_follow_quote_when_end_is_late() {
        let mut config = GeneratorConfig::canonical();
        config.birth_end = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let pricing = PricingModel::new(PricingConfig::canonical()).unwrap();
        let generator = Generator::new(&config, &pricing, today()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for r in generator.generate(500, &mut rng).unwrap() {
            assert!(r.owner().birth_date <= r.created_at().date());
        }
    }

    #[test]
    fn cars_are_never_built_after_their_quote() {
        for r in generate(2_000, 42) {
            assert!(r.vehicle_age() >= 0, "created {} produced {}", r.created_at(), r.vehicle().production_year);
        }
    }

    #[test]
    fn quotes_before_the_catalog_years_end_cap_production_year() {
        let config = GeneratorConfig::canonical();
        let pricing = PricingModel::new(PricingConfig::canonical()).unwrap();
        let today = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let generator = Generator::new(&config, &pricing, today).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let records = generator.generate(2_000, &mut rng).unwrap();
        assert!(records.iter().all(|r| r.vehicle().production_year <= r.created_at().year()));
        assert!(records.iter().any(|r| r.vehicle_age() == 0));
    }

    #[test]
    fn trend_starts_four_years_before_reference_date() {
        let config = GeneratorConfig::canonical();
        let pricing = PricingModel::new(PricingConfig::canonical()).unwrap();
        let generator = Generator::new(&config, &pricing, today()).unwrap();
        assert_eq!((today() - generator.trend_start()).num_days(), 1460);
    }
}
