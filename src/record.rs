use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{InsurerId, Location, Month};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub model: String,
    pub power_kw: u32,
    pub production_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub birth_date: NaiveDate,
}

/// One insurer's offer inside a quote record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsurerPrice {
    #[serde(rename = "brandCode")]
    pub insurer_id: InsurerId,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
}

/// One simulated customer's shopping event with the prices of every insurer
/// that did not refuse the risk.
///
/// Construction (and deserialization) enforce that each insurer appears at
/// most once, that every price is positive, and that neither the owner nor
/// the vehicle postdates the quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuoteDocument")]
pub struct QuoteRecord {
    created_at: NaiveDateTime,
    owner: Owner,
    vehicle: Vehicle,
    location: Location,
    prices: Vec<InsurerPrice>,
}

/// Unvalidated wire shape of [`QuoteRecord`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDocument {
    created_at: NaiveDateTime,
    owner: Owner,
    vehicle: Vehicle,
    location: Location,
    #[serde(default)]
    prices: Vec<InsurerPrice>,
}

impl TryFrom<QuoteDocument> for QuoteRecord {
    type Error = Error;

    fn try_from(doc: QuoteDocument) -> Result<Self, Self::Error> {
        QuoteRecord::new(doc.created_at, doc.owner, doc.vehicle, doc.location, doc.prices)
    }
}

impl QuoteRecord {
    pub fn new(
        created_at: NaiveDateTime,
        owner: Owner,
        vehicle: Vehicle,
        location: Location,
        prices: Vec<InsurerPrice>,
    ) -> Result<Self, Error> {
        if owner.birth_date > created_at.date() {
            return Err(Error::BornAfterQuote {
                birth_date: owner.birth_date,
                created_on: created_at.date(),
            });
        }
        if vehicle.production_year > created_at.year() {
            return Err(Error::BuiltAfterQuote {
                production_year: vehicle.production_year,
                created_year: created_at.year(),
            });
        }
        let mut seen = HashSet::with_capacity(prices.len());
        for p in &prices {
            if !seen.insert(p.insurer_id) {
                return Err(Error::DuplicateInsurer { insurer: p.insurer_id });
            }
            // `!(x > 0)` also rejects NaN.
            if !(p.total_amount > 0.0) {
                return Err(Error::NonPositivePrice {
                    insurer: p.insurer_id,
                    price: p.total_amount,
                });
            }
        }
        Ok(QuoteRecord { created_at, owner, vehicle, location, prices })
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Priced insurers; excluded insurers are absent.
    pub fn prices(&self) -> &[InsurerPrice] {
        &self.prices
    }

    pub fn price_for(&self, insurer: InsurerId) -> Option<f64> {
        self.prices.iter().find(|p| p.insurer_id == insurer).map(|p| p.total_amount)
    }

    /// Owner's age in whole years on the day the quote was created.
    pub fn owner_age(&self) -> i32 {
        age_on(self.owner.birth_date, self.created_at.date())
    }

    /// Vehicle age in calendar years at quote creation.
    pub fn vehicle_age(&self) -> i32 {
        self.created_at.year() - self.vehicle.production_year
    }

    pub fn month(&self) -> Month {
        Month(self.created_at.month())
    }
}

/// Completed years between `birth` and `on`: the year difference, minus one
/// if `on` falls before the birthday in its year.
pub fn age_on(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}
