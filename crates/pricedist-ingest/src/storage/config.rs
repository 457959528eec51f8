use serde::{Deserialize, Serialize};
use std::env;

/// Object store settings
///
/// Without static keys the default AWS credential chain applies, which is
/// what a Lambda execution role provides.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: bool,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            region: env::var("S3_REGION").ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            access_key: env::var("S3_ACCESS_KEY").ok(),
            secret_key: env::var("S3_SECRET_KEY").ok(),
        }
    }

    pub fn for_minio(endpoint: impl Into<String>) -> Self {
        Self {
            region: Some("us-east-1".to_string()),
            endpoint: Some(endpoint.into()),
            path_style: true,
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
        }
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}
