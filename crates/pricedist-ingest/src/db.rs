//! Replace Writer
//!
//! Swaps the contents of `price_distributions` for a new batch inside one
//! transaction. Concurrent readers keep seeing the previous rows until the
//! commit, then see only the new ones.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::error::WriteError;
use crate::models::RecordBatch;

/// Rows per INSERT statement; 5 binds per row keeps each statement under
/// Postgres' 65535 bind parameter limit
pub const INSERT_CHUNK_ROWS: usize = 10_000;

/// Destination for parsed batches
#[async_trait]
pub trait ReplaceWriter: Send + Sync {
    /// Replace every row of the destination with `batch`, atomically
    async fn replace_all(&self, batch: &RecordBatch) -> Result<(), WriteError>;
}

/// Postgres-backed writer holding a single connection
#[derive(Debug, Clone)]
pub struct PgReplaceWriter {
    pool: PgPool,
}

impl PgReplaceWriter {
    /// Connect with the configured connection string
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, WriteError> {
        let url = config
            .url
            .as_deref()
            .ok_or(WriteError::MissingConnectionString)?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await
            .map_err(WriteError::Connect)?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Release the connection at the end of an invocation
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}

#[async_trait]
impl ReplaceWriter for PgReplaceWriter {
    #[instrument(skip(self, batch), fields(key = %batch.source_key, records = batch.len()))]
    async fn replace_all(&self, batch: &RecordBatch) -> Result<(), WriteError> {
        let mut tx = self.pool.begin().await.map_err(WriteError::Transaction)?;

        let deleted = sqlx::query("DELETE FROM price_distributions")
            .execute(&mut *tx)
            .await
            .map_err(WriteError::Clear)?
            .rows_affected();

        debug!(deleted, "Cleared previous price distributions");

        for chunk in batch.records.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO price_distributions \
                 (realm_id, auction_house_id, item_id, buyout_each, quantity) ",
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.realm_id)
                    .push_bind(record.auction_house_id)
                    .push_bind(record.item_id)
                    .push_bind(record.buyout_each)
                    .push_bind(record.quantity);
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(WriteError::Insert)?;

            debug!(rows = chunk.len(), "Inserted price distribution chunk");
        }

        tx.commit().await.map_err(WriteError::Commit)?;

        info!(
            deleted,
            inserted = batch.len(),
            "Replaced price distributions"
        );

        Ok(())
    }
}
