//! Object Fetcher
//!
//! Opens the body of one object as an async byte stream. A new S3 client is
//! built for every fetch; nothing is shared between calls. The returned
//! stream owns the underlying connection and releases it when dropped.

use std::pin::Pin;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, Client};
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

use crate::error::FetchError;

pub mod config;

use self::config::StorageConfig;

/// Readable body of a fetched object
pub type ObjectStream = Pin<Box<dyn AsyncRead + Send>>;

/// Source of object bodies, keyed by bucket and decoded key
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectStream, FetchError>;
}

/// S3-backed fetcher
#[derive(Debug, Clone)]
pub struct S3Fetcher {
    config: StorageConfig,
}

impl S3Fetcher {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Build a fresh, authenticated client from the configuration
    pub async fn client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some((access_key, secret_key)) = self.config.static_credentials() {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "pricedist-storage",
            ));
        }

        let shared = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(self.config.path_style);

        if let Some(endpoint) = &self.config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        Client::from_conf(s3_config.build())
    }
}

#[async_trait]
impl ObjectFetcher for S3Fetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectStream, FetchError> {
        debug!("Getting stream from s3://{}/{}", bucket, key);

        let client = self.client().await;

        let response = client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FetchError::new(bucket, key, e))?;

        debug!(
            content_length = ?response.content_length(),
            "Opened s3://{}/{}",
            bucket,
            key
        );

        Ok(Box::pin(response.body.into_async_read()))
    }
}
