use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::PricingConfig;
use crate::error::Error;
use crate::types::{InsurerId, Location, Month};

/// Lowest price a base draw can produce; the normal tail is floored here.
pub const MIN_PRICE: f64 = 0.01;

/// Uniform multiplier range `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRange {
    pub low: f64,
    pub high: f64,
}

impl FactorRange {
    pub const fn new(low: f64, high: f64) -> Self {
        FactorRange { low, high }
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low > 0.0 && self.low <= self.high
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        rng.random_range(self.low..=self.high)
    }
}

/// Per-insurer value with a fallback for insurers without an override.
#[derive(Debug, Clone, PartialEq)]
pub struct InsurerTable<T> {
    default: T,
    overrides: Vec<(InsurerId, T)>,
}

impl<T> InsurerTable<T> {
    pub fn new(default: T) -> Self {
        InsurerTable { default, overrides: Vec::new() }
    }

    pub fn with(mut self, insurer: InsurerId, value: T) -> Self {
        self.overrides.retain(|(id, _)| *id != insurer);
        self.overrides.push((insurer, value));
        self
    }

    pub fn get(&self, insurer: InsurerId) -> &T {
        self.overrides
            .iter()
            .find(|(id, _)| *id == insurer)
            .map_or(&self.default, |(_, v)| v)
    }

    /// All values with a label: `"others"` for the default, then each override.
    pub fn entries(&self) -> impl Iterator<Item = (String, &T)> {
        std::iter::once(("others".to_string(), &self.default))
            .chain(self.overrides.iter().map(|(id, v)| (id.to_string(), v)))
    }
}

/// Normal distribution of the unadjusted price at the start of the trend window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseDistribution {
    pub starting_price: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExclusionCondition {
    LocationIs(Location),
    OwnerYoungerThan(i32),
    VehicleOlderThan(i32),
}

impl ExclusionCondition {
    pub fn holds(&self, ctx: &QuoteContext) -> bool {
        match *self {
            ExclusionCondition::LocationIs(location) => ctx.location == location,
            ExclusionCondition::OwnerYoungerThan(age) => ctx.owner_age < age,
            ExclusionCondition::VehicleOlderThan(age) => ctx.vehicle_age > age,
        }
    }
}

/// An insurer refusing a risk with `probability` whenever `condition` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExclusionRule {
    pub insurer: InsurerId,
    pub condition: ExclusionCondition,
    pub probability: f64,
}

/// Risk attributes the bias model reads, all taken at quote creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteContext {
    pub owner_age: i32,
    pub vehicle_age: i32,
    pub location: Location,
    pub month: Month,
    /// Days between the start of the trend window and quote creation.
    pub trend_days: i64,
}

/// A multiplicative adjustment step, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    YoungDriver,
    SeniorDriver,
    NewCar,
    OldCar,
    Location(Location),
    Season(&'static str),
}

pub struct PricingModel {
    config: PricingConfig,
}

impl PricingModel {
    pub fn new(config: PricingConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(PricingModel { config })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price `insurer`'s offer for a risk, or `None` if the insurer refuses it.
    pub fn quote(&self, insurer: InsurerId, ctx: &QuoteContext, rng: &mut impl Rng) -> Option<f64> {
        if self.is_excluded(insurer, ctx, rng) {
            return None;
        }
        let base = self.sample_base(insurer, ctx, rng);
        let price = self
            .applicable_factors(insurer, ctx)
            .iter()
            .fold(base, |price, (_, range)| price * range.sample(rng));
        Some(price)
    }

    /// Underwriting refusal. Insurer-specific rules only draw when their
    /// condition holds; the blanket refusal always draws.
    pub fn is_excluded(&self, insurer: InsurerId, ctx: &QuoteContext, rng: &mut impl Rng) -> bool {
        let mut excluded = false;
        for rule in self.config.exclusions.iter().filter(|r| r.insurer == insurer) {
            if rule.condition.holds(ctx) && rng.random_bool(rule.probability) {
                excluded = true;
            }
        }
        if rng.random_bool(self.config.blanket_exclusion) {
            excluded = true;
        }
        excluded
    }

    /// Mean of the base distribution: the insurer's starting price plus a
    /// linear drift per 365 days of trend.
    pub fn base_mean(&self, insurer: InsurerId, trend_days: i64) -> f64 {
        let base = self.config.base.get(insurer);
        base.starting_price + trend_days as f64 / 365.0 * self.config.annual_drift
    }

    /// Base price drawn around the temporal trend, rounded to cents.
    pub fn sample_base(&self, insurer: InsurerId, ctx: &QuoteContext, rng: &mut impl Rng) -> f64 {
        let mean = self.base_mean(insurer, ctx.trend_days);
        let std_dev = self.config.base.get(insurer).std_dev;
        // std_dev is validated positive and finite at construction.
        let normal = Normal::new(mean, std_dev).expect("invalid Normal params");
        round_cents(normal.sample(rng)).max(MIN_PRICE)
    }

    /// Factor ranges applying to this insurer and risk, in the order they
    /// compound: driver age, vehicle age, location, season.
    pub fn applicable_factors(&self, insurer: InsurerId, ctx: &QuoteContext) -> Vec<(Adjustment, FactorRange)> {
        let c = &self.config;
        let mut out = Vec::with_capacity(4);

        if ctx.owner_age <= c.young_driver_max_age {
            out.push((Adjustment::YoungDriver, *c.young_driver.get(insurer)));
        } else if ctx.owner_age >= c.senior_driver_min_age {
            out.push((Adjustment::SeniorDriver, *c.senior_driver.get(insurer)));
        }

        if ctx.vehicle_age <= c.new_car_max_age {
            out.push((Adjustment::NewCar, *c.new_car.get(insurer)));
        } else if ctx.vehicle_age >= c.old_car_min_age {
            out.push((Adjustment::OldCar, *c.old_car.get(insurer)));
        }

        if let Some((location, table)) = c.locations.iter().find(|(l, _)| *l == ctx.location) {
            out.push((Adjustment::Location(*location), *table.get(insurer)));
        }

        if let Some(season) = c.seasons.iter().find(|s| s.months.contains(&ctx.month)) {
            out.push((Adjustment::Season(season.name), *season.factors.get(insurer)));
        }

        out
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn model() -> PricingModel {
        PricingModel::new(PricingConfig::canonical()).unwrap()
    }

    /// Middle-aged owner, mid-age car, neutral location, neutral month.
    fn neutral() -> QuoteContext {
        QuoteContext {
            owner_age: 40,
            vehicle_age: 7,
            location: Location::Ri,
            month: Month(4),
            trend_days: 0,
        }
    }

    fn exclusion_rate(model: &PricingModel, insurer: InsurerId, ctx: &QuoteContext) -> f64 {
        let mut rng = rng();
        let n = 20_000;
        let excluded = (0..n).filter(|_| model.is_excluded(insurer, ctx, &mut rng)).count();
        excluded as f64 / n as f64
    }

    #[test]
    fn insurer1_in_du_is_excluded_about_a_third_of_the_time() {
        // 1 - (1 - 0.3) * (1 - 0.05) = 0.335
        let ctx = QuoteContext { location: Location::Du, ..neutral() };
        let rate = exclusion_rate(&model(), InsurerId(1), &ctx);
        assert!((rate - 0.335).abs() < 0.02, "exclusion rate {rate:.3}");
    }

    #[test]
    fn insurer1_outside_du_only_has_blanket_exclusion() {
        let rate = exclusion_rate(&model(), InsurerId(1), &neutral());
        assert!((rate - 0.05).abs() < 0.01, "exclusion rate {rate:.3}");
    }

    #[test]
    fn insurer6_excludes_young_owners() {
        // 1 - 0.6 * 0.95 = 0.43
        let ctx = QuoteContext { owner_age: 21, ..neutral() };
        let rate = exclusion_rate(&model(), InsurerId(6), &ctx);
        assert!((rate - 0.43).abs() < 0.02, "exclusion rate {rate:.3}");

        let at_threshold = QuoteContext { owner_age: 25, ..neutral() };
        let rate = exclusion_rate(&model(), InsurerId(6), &at_threshold);
        assert!((rate - 0.05).abs() < 0.01, "age 25 is not under 25: {rate:.3}");
    }

    #[test]
    fn insurer3_excludes_old_cars() {
        // 1 - 0.8 * 0.95 = 0.24
        let ctx = QuoteContext { vehicle_age: 11, ..neutral() };
        let rate = exclusion_rate(&model(), InsurerId(3), &ctx);
        assert!((rate - 0.24).abs() < 0.02, "exclusion rate {rate:.3}");
    }

    #[test]
    fn base_mean_follows_linear_trend() {
        let m = model();
        assert!((m.base_mean(InsurerId(1), 0) - 150.0).abs() < 1e-9);
        assert!((m.base_mean(InsurerId(1), 365) - 155.0).abs() < 1e-9);
        assert!((m.base_mean(InsurerId(5), 4 * 365) - 165.0).abs() < 1e-9);
        assert!((m.base_mean(InsurerId(3), 730) - 155.0).abs() < 1e-9);
    }

    #[test]
    fn base_sample_mean_and_spread_match_insurer() {
        let m = model();
        let mut rng = rng();
        let n = 10_000;
        let samples: Vec<f64> = (0..n).map(|_| m.sample_base(InsurerId(1), &neutral(), &mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let sd = (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
        assert!((mean - 150.0).abs() < 1.0, "mean {mean:.2}");
        assert!((sd - 20.0).abs() < 1.0, "sd {sd:.2}");
    }

    #[test]
    fn base_sample_is_rounded_to_cents() {
        let m = model();
        let mut rng = rng();
        for _ in 0..1_000 {
            let p = m.sample_base(InsurerId(7), &neutral(), &mut rng);
            assert!(((p * 100.0) - (p * 100.0).round()).abs() < 1e-6, "{p} not rounded");
        }
    }

    #[test]
    fn neutral_risk_has_no_adjustments() {
        assert!(model().applicable_factors(InsurerId(2), &neutral()).is_empty());
    }

    #[test]
    fn adjustments_compound_in_fixed_order() {
        let ctx = QuoteContext {
            owner_age: 22,
            vehicle_age: 3,
            location: Location::Zg,
            month: Month(1),
            trend_days: 0,
        };
        let factors = model().applicable_factors(InsurerId(4), &ctx);
        let kinds: Vec<Adjustment> = factors.iter().map(|(a, _)| *a).collect();
        assert_eq!(
            kinds,
            vec![
                Adjustment::YoungDriver,
                Adjustment::NewCar,
                Adjustment::Location(Location::Zg),
                Adjustment::Season("winter"),
            ]
        );
        assert_eq!(factors[0].1, FactorRange::new(1.3, 1.6));
        assert_eq!(factors[1].1, FactorRange::new(0.9, 1.0));
        assert_eq!(factors[2].1, FactorRange::new(1.2, 1.5));
        assert_eq!(factors[3].1, FactorRange::new(1.1, 1.3));
    }

    #[test]
    fn bracket_boundaries_are_inclusive() {
        let m = model();
        let young = QuoteContext { owner_age: 25, ..neutral() };
        let senior = QuoteContext { owner_age: 65, ..neutral() };
        let new_car = QuoteContext { vehicle_age: 5, ..neutral() };
        let old_car = QuoteContext { vehicle_age: 10, ..neutral() };
        assert_eq!(m.applicable_factors(InsurerId(0), &young)[0].0, Adjustment::YoungDriver);
        assert_eq!(m.applicable_factors(InsurerId(0), &senior)[0].0, Adjustment::SeniorDriver);
        assert_eq!(m.applicable_factors(InsurerId(0), &new_car)[0].0, Adjustment::NewCar);
        assert_eq!(m.applicable_factors(InsurerId(0), &old_car)[0].0, Adjustment::OldCar);
        let middle = QuoteContext { owner_age: 64, vehicle_age: 9, ..neutral() };
        assert!(m.applicable_factors(InsurerId(0), &middle).is_empty());
    }

    #[test]
    fn insurer_overrides_pick_their_ranges() {
        let m = model();
        let senior = QuoteContext { owner_age: 70, ..neutral() };
        assert_eq!(m.applicable_factors(InsurerId(8), &senior)[0].1, FactorRange::new(1.1, 1.25));
        assert_eq!(m.applicable_factors(InsurerId(0), &senior)[0].1, FactorRange::new(1.4, 1.65));
        assert_eq!(m.applicable_factors(InsurerId(3), &senior)[0].1, FactorRange::new(1.3, 1.5));

        let summer_st = QuoteContext { location: Location::St, month: Month(7), ..neutral() };
        let f = m.applicable_factors(InsurerId(7), &summer_st);
        assert_eq!(f[0], (Adjustment::Location(Location::St), FactorRange::new(1.1, 1.3)));
        assert_eq!(f[1], (Adjustment::Season("summer"), FactorRange::new(1.2, 1.3)));
    }

    #[test]
    fn quoted_price_stays_within_compounded_bounds() {
        let m = model();
        let mut rng = rng();
        let ctx = QuoteContext {
            owner_age: 70,
            vehicle_age: 12,
            location: Location::St,
            month: Month(8),
            trend_days: 500,
        };
        for insurer in (0..10).map(InsurerId) {
            let factors = m.applicable_factors(insurer, &ctx);
            let lo: f64 = factors.iter().map(|(_, r)| r.low).product();
            let hi: f64 = factors.iter().map(|(_, r)| r.high).product();
            for _ in 0..200 {
                let mut probe = rng.clone();
                if m.is_excluded(insurer, &ctx, &mut probe) {
                    let _ = m.quote(insurer, &ctx, &mut rng);
                    continue;
                }
                let mut base_rng = probe.clone();
                let base = m.sample_base(insurer, &ctx, &mut base_rng);
                let price = m.quote(insurer, &ctx, &mut rng).expect("same stream, not excluded");
                assert!(price >= base * lo - 1e-9 && price <= base * hi + 1e-9, "{price} outside [{}, {}]", base * lo, base * hi);
            }
        }
    }

    #[test]
    fn prices_are_always_positive() {
        let m = model();
        let mut rng = rng();
        for age in [18, 25, 40, 65, 80] {
            for vehicle_age in [0, 5, 8, 10, 22] {
                for location in Location::ALL {
                    for month in 1..=12 {
                        let ctx = QuoteContext { owner_age: age, vehicle_age, location, month: Month(month), trend_days: 100 };
                        for insurer in (0..10).map(InsurerId) {
                            if let Some(p) = m.quote(insurer, &ctx, &mut rng) {
                                assert!(p > 0.0, "{insurer} priced {p}");
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn same_seed_gives_same_quotes() {
        let m = model();
        let ctx = QuoteContext { owner_age: 23, ..neutral() };
        let mut a = rng();
        let mut b = rng();
        let qa: Vec<Option<f64>> = (0..10).map(|i| m.quote(InsurerId(i), &ctx, &mut a)).collect();
        let qb: Vec<Option<f64>> = (0..10).map(|i| m.quote(InsurerId(i), &ctx, &mut b)).collect();
        assert_eq!(qa, qb);
    }

    #[test]
    fn table_override_replaces_earlier_entry() {
        let t = InsurerTable::new(1.0).with(InsurerId(1), 2.0).with(InsurerId(1), 3.0);
        assert_eq!(*t.get(InsurerId(1)), 3.0);
        assert_eq!(*t.get(InsurerId(2)), 1.0);
        assert_eq!(t.entries().count(), 2);
    }

    #[test]
    fn invalid_model_config_is_rejected() {
        let mut config = PricingConfig::canonical();
        config.base = InsurerTable::new(BaseDistribution { starting_price: 145.0, std_dev: 0.0 });
        assert!(PricingModel::new(config).is_err());
    }
}
