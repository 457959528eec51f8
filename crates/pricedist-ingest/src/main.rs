//! Price Distribution Ingest - Lambda entry point

use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use pricedist_common::logging::{init_logging, LogConfig};
use tracing::{info, instrument};

use pricedist_ingest::{config::IngestConfig, coordinator::EventCoordinator};

/// Quiet the dependencies; our own crate follows the configured level
const LOG_DIRECTIVES: &str = "sqlx=warn,aws_config=warn";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let log_config = LogConfig::builder()
        .filter_directives(LOG_DIRECTIVES)
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = IngestConfig::from_env()?;
    info!(storage = ?config.storage, "Configuration loaded");

    run(service_fn(|event: LambdaEvent<S3Event>| handler(event, &config))).await
}

/// One invocation: connect, process every record of the event, disconnect
#[instrument(skip_all, fields(request_id = %event.context.request_id))]
async fn handler(event: LambdaEvent<S3Event>, config: &IngestConfig) -> Result<(), Error> {
    info!(
        records = event.payload.records.len(),
        "Received S3 notification batch"
    );

    let coordinator = EventCoordinator::from_config(config).await?;
    let result = coordinator.handle_event(&event.payload).await;
    coordinator.shutdown().await;

    result?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pricedist_common::logging::{build_filter, LogLevel};
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_debug_level_reaches_stage_logs() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .filter_directives(LOG_DIRECTIVES)
            .build();
        let subscriber = tracing_subscriber::registry().with(build_filter(&config).unwrap());

        let enabled = tracing::subscriber::with_default(subscriber, || {
            tracing::enabled!(target: "pricedist_ingest::coordinator", tracing::Level::DEBUG)
        });

        assert!(enabled);
    }
}
