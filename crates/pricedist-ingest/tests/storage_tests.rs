//! Object fetcher integration tests
//!
//! **Requirements**:
//! - MinIO or S3 must be running and accessible
//! - S3_ENDPOINT environment variable must be set (e.g., "http://localhost:9000")
//! - Tests will be skipped if S3_ENDPOINT is not configured

use aws_sdk_s3::primitives::ByteStream;
use pricedist_ingest::{
    parser::parse_batch,
    storage::{config::StorageConfig, ObjectFetcher, S3Fetcher},
};
use tokio::io::AsyncReadExt;

const BUCKET: &str = "pricedist-test";

/// Create a fetcher and the test bucket if MinIO is available
async fn setup_fetcher() -> Option<S3Fetcher> {
    let endpoint = std::env::var("S3_ENDPOINT").ok()?;

    let mut config = StorageConfig::from_env();
    if config.static_credentials().is_none() {
        config = StorageConfig::for_minio(endpoint);
    }
    config.path_style = true;

    let fetcher = S3Fetcher::new(config);

    // The bucket may already exist from an earlier run
    let _ = fetcher.client().await.create_bucket().bucket(BUCKET).send().await;

    Some(fetcher)
}

async fn put(fetcher: &S3Fetcher, key: &str, body: &str) {
    fetcher
        .client()
        .await
        .put_object()
        .bucket(BUCKET)
        .key(key)
        .body(ByteStream::from(body.as_bytes().to_vec()))
        .send()
        .await
        .expect("Upload should succeed");
}

#[tokio::test]
async fn test_fetch_streams_object_body() {
    let Some(fetcher) = setup_fetcher().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let key = "price distributions/stream test.csv";
    put(&fetcher, key, "header\n1,2,100,500,3\n").await;

    let mut body = fetcher.fetch(BUCKET, key).await.expect("Fetch should succeed");
    let mut content = String::new();
    body.read_to_string(&mut content)
        .await
        .expect("Body should be readable");

    assert_eq!(content, "header\n1,2,100,500,3\n");
}

#[tokio::test]
async fn test_fetch_then_parse() {
    let Some(fetcher) = setup_fetcher().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let key = "price-distributions/parse.csv";
    put(&fetcher, key, "header\n1,2,100,500,3\n1,2,101,250,10\n").await;

    let body = fetcher.fetch(BUCKET, key).await.expect("Fetch should succeed");
    let batch = parse_batch(body, key).await.expect("Parse should succeed");

    assert_eq!(batch.len(), 2);
}

#[tokio::test]
async fn test_fetch_missing_object() {
    let Some(fetcher) = setup_fetcher().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let err = match fetcher.fetch(BUCKET, "does/not/exist.csv").await {
        Ok(_) => panic!("Missing object should fail"),
        Err(e) => e,
    };

    assert_eq!(err.bucket, BUCKET);
    assert_eq!(err.key, "does/not/exist.csv");
}
