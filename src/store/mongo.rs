use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use tracing::{info, instrument};

use crate::error::Error;
use crate::record::QuoteRecord;
use crate::store::QuoteStore;

/// Used when the connection string does not name a database.
pub const DEFAULT_DATABASE: &str = "insurance_db";
pub const COLLECTION_NAME: &str = "insurance_collection";

/// Quote records as documents of one MongoDB collection.
pub struct MongoStore {
    collection: Collection<QuoteRecord>,
}

impl MongoStore {
    /// Connect and ping the server so an unreachable backend fails the run
    /// before any work is done.
    #[instrument(skip_all)]
    pub async fn connect(uri: &str) -> Result<Self, Error> {
        let connection = |source| Error::Connection { uri: uri.to_string(), source };
        let client = Client::with_uri_str(uri).await.map_err(connection)?;
        let database = client.default_database().unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        database.run_command(doc! { "ping": 1 }).await.map_err(connection)?;
        info!(database = database.name(), collection = COLLECTION_NAME, "connected");
        Ok(MongoStore { collection: database.collection(COLLECTION_NAME) })
    }
}

impl QuoteStore for MongoStore {
    #[instrument(skip_all)]
    async fn insert_many(&self, records: &[QuoteRecord]) -> Result<usize, Error> {
        if records.is_empty() {
            return Ok(0);
        }
        let result = self.collection.insert_many(records).await?;
        info!(records = result.inserted_ids.len(), "inserted records");
        Ok(result.inserted_ids.len())
    }

    #[instrument(skip_all)]
    async fn load_all(&self) -> Result<Vec<QuoteRecord>, Error> {
        let records: Vec<QuoteRecord> = self.collection.find(doc! {}).await?.try_collect().await?;
        info!(records = records.len(), "loaded records");
        Ok(records)
    }

    #[instrument(skip_all)]
    async fn truncate(&self) -> Result<u64, Error> {
        let result = self.collection.delete_many(doc! {}).await?;
        info!(removed = result.deleted_count, "truncated collection");
        Ok(result.deleted_count)
    }
}
