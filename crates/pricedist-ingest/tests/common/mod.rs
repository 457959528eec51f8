//! Shared test utilities
//!
//! - In-memory object store and destination table for driving the coordinator
//! - Postgres setup for writer tests, skipped when `DATABASE_URL` is unset

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pricedist_ingest::{
    config::DatabaseConfig,
    db::{PgReplaceWriter, ReplaceWriter},
    models::{PriceDistribution, RecordBatch},
    storage::{ObjectFetcher, ObjectStream},
    FetchError, WriteError,
};

/// Default bucket used by fixtures
pub const TEST_BUCKET: &str = "sod-auctions-test";

/// Object store backed by a map of `(bucket, key)` to file contents
#[derive(Default)]
pub struct MemoryFetcher {
    objects: HashMap<(String, String), Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, body: &str) -> Self {
        self.objects.insert(
            (TEST_BUCKET.to_string(), key.to_string()),
            body.as_bytes().to_vec(),
        );
        self
    }

    /// Decoded keys requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectFetcher for MemoryFetcher {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectStream, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.to_string());
        }

        match self.objects.get(&(bucket.to_string(), key.to_string())) {
            Some(body) => Ok(Box::pin(std::io::Cursor::new(body.clone()))),
            None => Err(FetchError::new(
                bucket,
                key,
                "NoSuchKey: The specified key does not exist.",
            )),
        }
    }
}

/// Destination table held in memory
#[derive(Default)]
pub struct MemoryWriter {
    table: Mutex<Vec<PriceDistribution>>,
    writes: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer whose table already holds `rows`
    pub fn with_rows(rows: Vec<PriceDistribution>) -> Self {
        Self {
            table: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Writer that rejects every batch, leaving the table untouched
    pub fn failing(rows: Vec<PriceDistribution>) -> Self {
        Self {
            table: Mutex::new(rows),
            fail: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<PriceDistribution> {
        self.table.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Source keys of committed batches, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReplaceWriter for MemoryWriter {
    async fn replace_all(&self, batch: &RecordBatch) -> Result<(), WriteError> {
        if self.fail {
            return Err(WriteError::Insert(sqlx::Error::PoolTimedOut));
        }

        if let Ok(mut table) = self.table.lock() {
            *table = batch.records.clone();
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(batch.source_key.clone());
        }
        Ok(())
    }
}

/// Connect to the test database and apply migrations
///
/// Returns `None` when `DATABASE_URL` is not configured so callers can skip.
pub async fn setup_writer() -> Option<PgReplaceWriter> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let writer = match PgReplaceWriter::connect(&DatabaseConfig::with_url(url)).await {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Failed to connect to test database: {}", e);
            return None;
        },
    };

    sqlx::migrate!("../../migrations")
        .run(writer.pool())
        .await
        .expect("Failed to run migrations");

    Some(writer)
}

/// Every row of the destination table, ordered for comparison
pub async fn table_rows(writer: &PgReplaceWriter) -> Vec<PriceDistribution> {
    sqlx::query_as::<_, PriceDistribution>(
        "SELECT realm_id, auction_house_id, item_id, buyout_each, quantity \
         FROM price_distributions \
         ORDER BY realm_id, auction_house_id, item_id, buyout_each, quantity",
    )
    .fetch_all(writer.pool())
    .await
    .expect("Failed to read price_distributions")
}

pub fn sample_rows() -> Vec<PriceDistribution> {
    vec![
        PriceDistribution::new(1, 2, 100, 500, 3),
        PriceDistribution::new(1, 2, 101, 250, 10),
    ]
}
