//! Price Distribution Ingest Library
//!
//! Loads auction house price distribution CSV files from S3 into Postgres.
//!
//! # Overview
//!
//! Every S3 notification names one CSV file. For each file, in order:
//!
//! - **Object Fetcher** ([`storage`]): opens the object body as a stream
//! - **Record Parser** ([`parser`]): decodes it into [`models::PriceDistribution`]s
//! - **Replace Writer** ([`db`]): swaps the table contents in one transaction
//!
//! The [`coordinator`] drives the three and stops the batch at the first
//! error, which is returned to the Lambda runtime for redelivery.
//!
//! # Example
//!
//! ```no_run
//! use pricedist_ingest::{config::IngestConfig, coordinator::EventCoordinator, models::FileReference};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let coordinator = EventCoordinator::from_config(&config).await?;
//!     let files = vec![FileReference::new("sod-auctions", "price-distributions/latest.csv")];
//!     coordinator.handle(&files).await?;
//!     coordinator.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;

// Re-export commonly used types
pub use error::{DecodeError, FetchError, IngestError, IngestResult, ParseError, WriteError};
