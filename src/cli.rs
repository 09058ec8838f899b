use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    prelude::*,
    store::{MongoStore, NdjsonStore, Store},
};

/// Where quote records live.
#[derive(Clone, Parser)]
pub struct StoreArgs {
    /// MongoDB connection string. Takes precedence over `--data`.
    #[clap(long = "mongodb-uri", env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// NDJSON file used when no MongoDB connection string is given.
    #[clap(long = "data", default_value = "quotes.ndjson", env = "QUOTES_DATA")]
    pub data: PathBuf,
}

impl StoreArgs {
    pub async fn connect(&self) -> Result<Store> {
        match &self.mongodb_uri {
            Some(uri) => {
                let store = MongoStore::connect(uri).await.context("failed to connect to the quote store")?;
                Ok(Store::Mongo(store))
            }
            None => {
                info!(path = %self.data.display(), "using NDJSON store");
                Ok(Store::Ndjson(NdjsonStore::new(&self.data)))
            }
        }
    }
}

/// Load `.env` and install the console subscriber.
pub fn init() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .without_time()
        .compact()
        .init();
}
