//! Event Coordinator
//!
//! Drives fetch, parse and replace for each notification of a batch, in
//! arrival order. The first failure ends the batch: later notifications are
//! left for the runtime to redeliver.
//!
//! ```text
//! Idle -> Fetching -> Parsing -> Writing -> Idle
//!            \           \          \
//!             +-----------+----------+--> Failed
//! ```

use aws_lambda_events::event::s3::S3Event;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::config::IngestConfig;
use crate::db::{PgReplaceWriter, ReplaceWriter};
use crate::error::{DecodeError, IngestError, IngestResult};
use crate::models::FileReference;
use crate::parser::parse_batch;
use crate::storage::{ObjectFetcher, S3Fetcher};

/// Processing stage of a single notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Parsing,
    Writing,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Fetching => write!(f, "fetching"),
            Stage::Parsing => write!(f, "parsing"),
            Stage::Writing => write!(f, "writing"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a fully successful batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub files_processed: usize,
    pub records_written: usize,
}

pub struct EventCoordinator<F, W> {
    fetcher: F,
    writer: W,
}

impl EventCoordinator<S3Fetcher, PgReplaceWriter> {
    /// Build the production pipeline, connecting to the database once
    pub async fn from_config(config: &IngestConfig) -> IngestResult<Self> {
        let writer = PgReplaceWriter::connect(&config.database).await?;
        Ok(Self::new(S3Fetcher::new(config.storage.clone()), writer))
    }

    /// Close the database connection
    pub async fn shutdown(self) {
        self.writer.close().await;
    }
}

impl<F, W> EventCoordinator<F, W>
where
    F: ObjectFetcher,
    W: ReplaceWriter,
{
    pub fn new(fetcher: F, writer: W) -> Self {
        Self { fetcher, writer }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Process every notification in order, stopping at the first error
    pub async fn handle(&self, notifications: &[FileReference]) -> IngestResult<IngestSummary> {
        self.handle_each(notifications.iter().cloned().map(Ok), notifications.len())
            .await
    }

    /// Process every record of an S3 event in order
    ///
    /// A record is turned into a [`FileReference`] only when its turn comes,
    /// so a broken record still lets the records before it through.
    pub async fn handle_event(&self, event: &S3Event) -> IngestResult<IngestSummary> {
        let records = &event.records;
        self.handle_each(records.iter().map(FileReference::from_s3_record), records.len())
            .await
    }

    #[instrument(skip_all, fields(files = total))]
    async fn handle_each<I>(&self, notifications: I, total: usize) -> IngestResult<IngestSummary>
    where
        I: Iterator<Item = Result<FileReference, DecodeError>> + Send,
    {
        let mut summary = IngestSummary::default();

        for (index, file) in notifications.enumerate() {
            let skipped = total.saturating_sub(index + 1);

            let file = file.inspect_err(|e| {
                error!(index, skipped, error = %e, "Aborting notification batch");
            })?;

            let written = self.process(index, &file).await.inspect_err(|e| {
                error!(
                    index,
                    bucket = %file.bucket,
                    key = %file.key,
                    skipped,
                    error = %e,
                    "Aborting notification batch"
                );
            })?;

            summary.files_processed += 1;
            summary.records_written += written;
        }

        info!(
            files = summary.files_processed,
            records = summary.records_written,
            "Notification batch complete"
        );

        Ok(summary)
    }

    /// Run one notification through the pipeline, returning the rows written
    async fn process(&self, index: usize, file: &FileReference) -> IngestResult<usize> {
        let key = file.decoded_key().inspect_err(|_| {
            debug!(index, from = %Stage::Idle, to = %Stage::Failed, "stage");
        })?;

        let span = info_span!("file", index, bucket = %file.bucket, key = %key);

        async {
            let mut stage = Stage::Fetching;
            debug!(from = %Stage::Idle, to = %stage, "stage");

            let result = async {
                info!("downloading file {}", key);
                let body = self.fetcher.fetch(&file.bucket, &key).await?;

                stage = Stage::Parsing;
                debug!(from = %Stage::Fetching, to = %stage, "stage");
                info!("reading price distributions from file..");
                let batch = parse_batch(body, &key).await?;

                stage = Stage::Writing;
                debug!(from = %Stage::Parsing, to = %stage, "stage");
                info!("writing {} price distributions to database", batch.len());
                self.writer.replace_all(&batch).await?;

                Ok::<_, IngestError>(batch.len())
            }
            .await;

            let next = if result.is_ok() { Stage::Idle } else { Stage::Failed };
            debug!(from = %stage, to = %next, "stage");

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Fetching.to_string(), "fetching");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }

    #[test]
    fn test_summary_serializes() {
        let summary = IngestSummary {
            files_processed: 2,
            records_written: 7,
        };
        let json = serde_json::to_value(summary).unwrap_or_default();
        assert_eq!(json["files_processed"], 2);
        assert_eq!(json["records_written"], 7);
    }
}
