use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{info, instrument};

use crate::error::Error;
use crate::record::QuoteRecord;
use crate::store::QuoteStore;

/// One JSON document per line in a local file.
pub struct NdjsonStore {
    path: PathBuf,
}

impl NdjsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        NdjsonStore { path: path.into() }
    }
}

impl QuoteStore for NdjsonStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn insert_many(&self, records: &[QuoteRecord]) -> Result<usize, Error> {
        let io = |e| Error::io(&self.path, e);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| Error::io(parent, e))?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path).await.map_err(io)?;
        let mut writer = BufWriter::new(file);
        let mut line = Vec::new();
        for record in records {
            line.clear();
            serde_json::to_writer(&mut line, record).map_err(|e| Error::io(&self.path, e.into()))?;
            line.push(b'\n');
            writer.write_all(&line).await.map_err(io)?;
        }
        writer.flush().await.map_err(io)?;
        info!(records = records.len(), "appended records");
        Ok(records.len())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn load_all(&self) -> Result<Vec<QuoteRecord>, Error> {
        let io = |e| Error::io(&self.path, e);
        let file = File::open(&self.path).await.map_err(io)?;
        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        let mut line_no = 0;
        while let Some(line) = lines.next_line().await.map_err(io)? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| Error::Json {
                path: self.path.clone(),
                line: line_no,
                source,
            })?;
            records.push(record);
        }
        info!(records = records.len(), "loaded records");
        Ok(records)
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn truncate(&self) -> Result<u64, Error> {
        let io = |e| Error::io(&self.path, e);
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io(e)),
        };
        let mut lines = BufReader::new(file).lines();
        let mut removed = 0u64;
        while let Some(line) = lines.next_line().await.map_err(io)? {
            if !line.trim().is_empty() {
                removed += 1;
            }
        }
        File::create(&self.path).await.map_err(io)?;
        info!(removed, "truncated store");
        Ok(removed)
    }
}
