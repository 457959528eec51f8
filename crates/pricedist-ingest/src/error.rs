//! Error types for the ingest pipeline
//!
//! Each pipeline stage has its own error type. `IngestError` wraps them so
//! the coordinator can return the first failure of a batch unchanged.

use thiserror::Error;

/// Result type alias for ingest operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Boxed error cause used where the underlying SDK error type is not public
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error returned by the coordinator
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("error decoding S3 object key: {0}")]
    Decode(#[from] DecodeError),

    #[error("error downloading file: {0}")]
    Fetch(#[from] FetchError),

    #[error("error reading CSV file: {0}")]
    Parse(#[from] ParseError),

    #[error("error inserting price distributions into database: {0}")]
    Write(#[from] WriteError),
}

/// The object key (or the notification carrying it) could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid object key '{key}': {reason}")]
pub struct DecodeError {
    pub key: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Object store access failed
#[derive(Error, Debug)]
#[error("failed to fetch s3://{bucket}/{key}")]
pub struct FetchError {
    pub bucket: String,
    pub key: String,
    #[source]
    pub source: BoxError,
}

impl FetchError {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }
}

/// CSV structure or content error
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read CSV header")]
    HeaderMissing {
        #[source]
        source: Option<csv_async::Error>,
    },

    #[error("malformed row {row} '{content}': {reason}")]
    RowMalformed {
        /// Zero-based record index; the header is row 0 and blank lines
        /// are not counted
        row: usize,
        content: String,
        reason: String,
    },

    #[error("failed to read row {row} from stream")]
    Read {
        row: usize,
        #[source]
        source: csv_async::Error,
    },
}

impl ParseError {
    /// Row index of the failure, if the failure is tied to a data row
    pub fn row(&self) -> Option<usize> {
        match self {
            ParseError::HeaderMissing { .. } => None,
            ParseError::RowMalformed { row, .. } | ParseError::Read { row, .. } => Some(*row),
        }
    }
}

/// Relational store access or transaction failure
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("database connection string is not configured")]
    MissingConnectionString,

    #[error("error connecting to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to begin transaction: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("failed to clear existing price distributions: {0}")]
    Clear(#[source] sqlx::Error),

    #[error("failed to insert price distributions: {0}")]
    Insert(#[source] sqlx::Error),

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),
}
