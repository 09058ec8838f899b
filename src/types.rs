use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Insurer identifier. Persisted and displayed as `insurer<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InsurerId(pub u32);

impl fmt::Display for InsurerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insurer{}", self.0)
    }
}

impl FromStr for InsurerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("insurer")
            .and_then(|n| n.parse().ok())
            .map(InsurerId)
            .ok_or_else(|| Error::UnknownInsurer(s.to_string()))
    }
}

impl TryFrom<String> for InsurerId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InsurerId> for String {
    fn from(id: InsurerId) -> Self {
        id.to_string()
    }
}

/// Registration location (licence-plate prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "ZG")]
    Zg,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "RI")]
    Ri,
    #[serde(rename = "DU")]
    Du,
}

impl Location {
    /// Draw order of the generator and panel order of the location figure.
    pub const ALL: [Location; 4] = [Location::Zg, Location::St, Location::Ri, Location::Du];

    pub fn code(self) -> &'static str {
        match self {
            Location::Zg => "ZG",
            Location::St => "ST",
            Location::Ri => "RI",
            Location::Du => "DU",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::ALL
            .into_iter()
            .find(|l| l.code() == s)
            .ok_or_else(|| Error::UnknownLocation(s.to_string()))
    }
}

/// Calendar month, 1 = January.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month(pub u32);

impl Month {
    pub fn name(self) -> &'static str {
        u8::try_from(self.0)
            .ok()
            .and_then(|m| chrono::Month::try_from(m).ok())
            .map_or("Unknown", |m| m.name())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
