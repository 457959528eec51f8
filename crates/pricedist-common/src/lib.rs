//! Price Distribution Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the price distribution ingest workspace.
//!
//! - **Logging**: structured `tracing` setup driven by environment variables
//!
//! # Example
//!
//! ```no_run
//! use pricedist_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod logging;
