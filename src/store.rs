//! Persistence of generated quote records.
//!
//! Generation writes a dataset with one bulk insert; analysis reads it back
//! with one bulk load. Two backends exist: a newline-delimited JSON file and
//! a MongoDB collection.

mod mongo;
mod ndjson;

pub use self::mongo::MongoStore;
pub use self::ndjson::NdjsonStore;

use crate::error::Error;
use crate::record::QuoteRecord;

#[allow(async_fn_in_trait)]
pub trait QuoteStore {
    /// Append `records`, returning how many were written.
    async fn insert_many(&self, records: &[QuoteRecord]) -> Result<usize, Error>;

    /// Every stored record.
    async fn load_all(&self) -> Result<Vec<QuoteRecord>, Error>;

    /// Delete every stored record, returning how many were removed.
    async fn truncate(&self) -> Result<u64, Error>;
}

/// Backend picked at runtime from the command line.
pub enum Store {
    Ndjson(NdjsonStore),
    Mongo(MongoStore),
}

impl QuoteStore for Store {
    async fn insert_many(&self, records: &[QuoteRecord]) -> Result<usize, Error> {
        match self {
            Store::Ndjson(s) => s.insert_many(records).await,
            Store::Mongo(s) => s.insert_many(records).await,
        }
    }

    async fn load_all(&self) -> Result<Vec<QuoteRecord>, Error> {
        match self {
            Store::Ndjson(s) => s.load_all().await,
            Store::Mongo(s) => s.load_all().await,
        }
    }

    async fn truncate(&self) -> Result<u64, Error> {
        match self {
            Store::Ndjson(s) => s.truncate().await,
            Store::Mongo(s) => s.truncate().await,
        }
    }
}
