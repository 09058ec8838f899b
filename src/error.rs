use std::path::PathBuf;

use thiserror::Error;

use crate::types::InsurerId;

/// Errors raised by the generator, the aggregator and the quote stores.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage backend could not be reached. Fatal for the run.
    #[error("cannot connect to {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("storage operation failed: {0}")]
    Storage(#[from] mongodb::error::Error),

    /// A statistic was requested over a group without any price.
    #[error("aggregation group `{group}` has no prices")]
    EmptyGroup { group: String },

    /// A percentile position points past the last sorted sample.
    #[error("percentile index {index} is out of range for {count} samples")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("insurer {insurer} is priced more than once in the same record")]
    DuplicateInsurer { insurer: InsurerId },

    #[error("insurer {insurer} has a non-positive price {price}")]
    NonPositivePrice { insurer: InsurerId, price: f64 },

    #[error("owner born on {birth_date} after the quote was created on {created_on}")]
    BornAfterQuote {
        birth_date: chrono::NaiveDate,
        created_on: chrono::NaiveDate,
    },

    #[error("vehicle produced in {production_year} after the quote was created in {created_year}")]
    BuiltAfterQuote { production_year: i32, created_year: i32 },

    #[error("invalid range `{name}`: [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown insurer id `{0}` (expected `insurer<N>`)")]
    UnknownInsurer(String),

    #[error("unknown location code `{0}`")]
    UnknownLocation(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at line {line} in {path}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn empty_group(group: impl ToString) -> Self {
        Self::EmptyGroup { group: group.to_string() }
    }
}
