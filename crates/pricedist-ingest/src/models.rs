//! Data model for the ingest pipeline

use std::borrow::Cow;

use aws_lambda_events::event::s3::S3EventRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// A file that arrived in the object store
///
/// `key` is kept exactly as delivered by the notification; use
/// [`FileReference::decoded_key`] before touching the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub bucket: String,
    pub key: String,
    pub event_name: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub region: Option<String>,
    pub size: Option<i64>,
}

impl FileReference {
    /// Reference with no arrival metadata, e.g. for a manual redrive
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            event_name: None,
            event_time: None,
            region: None,
            size: None,
        }
    }

    pub fn from_s3_record(record: &S3EventRecord) -> Result<Self, DecodeError> {
        let key = record
            .s3
            .object
            .key
            .clone()
            .ok_or_else(|| DecodeError::new("", "notification has no object key"))?;
        let bucket = record
            .s3
            .bucket
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DecodeError::new(key.as_str(), "notification has no bucket name"))?;

        Ok(Self {
            bucket,
            key,
            event_name: record.event_name.clone(),
            event_time: Some(record.event_time),
            region: record.aws_region.clone(),
            size: record.s3.object.size,
        })
    }

    /// The object key with transport escaping removed
    pub fn decoded_key(&self) -> Result<String, DecodeError> {
        let key = query_unescape(&self.key)?;
        if key.is_empty() {
            return Err(DecodeError::new(self.key.as_str(), "object key is empty"));
        }
        Ok(key)
    }
}

/// Undo query-string escaping: `+` becomes a space and `%XX` a byte
///
/// Fails when a `%` is not followed by two hex digits or when the decoded
/// bytes are not UTF-8.
pub fn query_unescape(raw: &str) -> Result<String, DecodeError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape_ok = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !escape_ok {
                return Err(DecodeError::new(raw, format!("invalid URL escape at byte {}", i)));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|e| DecodeError::new(raw, format!("decoded key is not UTF-8: {}", e)))
}

/// One ingested CSV row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceDistribution {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub buyout_each: i32,
    pub quantity: i32,
}

impl PriceDistribution {
    pub fn new(
        realm_id: i16,
        auction_house_id: i16,
        item_id: i32,
        buyout_each: i32,
        quantity: i32,
    ) -> Self {
        Self {
            realm_id,
            auction_house_id,
            item_id,
            buyout_each,
            quantity,
        }
    }
}

/// Every record parsed from one file, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    /// Decoded key of the file the records came from
    pub source_key: String,
    pub records: Vec<PriceDistribution>,
}

impl RecordBatch {
    pub fn new(source_key: impl Into<String>, records: Vec<PriceDistribution>) -> Self {
        Self {
            source_key: source_key.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use aws_lambda_events::event::s3::S3Event;

    const S3_PUT_EVENT: &str = r#"{
      "Records": [
        {
          "eventVersion": "2.1",
          "eventSource": "aws:s3",
          "awsRegion": "us-east-1",
          "eventTime": "2026-10-14T06:00:00.000Z",
          "eventName": "ObjectCreated:Put",
          "userIdentity": { "principalId": "EXAMPLE" },
          "requestParameters": { "sourceIPAddress": "127.0.0.1" },
          "responseElements": {
            "x-amz-request-id": "EXAMPLE123456789",
            "x-amz-id-2": "EXAMPLE123/5678abcdefghijklambdaisawesome/mnopqrstuvwxyzABCDEFGH"
          },
          "s3": {
            "s3SchemaVersion": "1.0",
            "configurationId": "testConfigRule",
            "bucket": {
              "name": "sod-auctions",
              "ownerIdentity": { "principalId": "EXAMPLE" },
              "arn": "arn:aws:s3:::sod-auctions"
            },
            "object": {
              "key": "price-distributions/realm+5/2026-10-14%2006.csv",
              "size": 1024,
              "eTag": "0123456789abcdef0123456789abcdef",
              "sequencer": "0A1B2C3D4E5F678901"
            }
          }
        }
      ]
    }"#;

    #[test]
    fn test_from_s3_record() {
        let event: S3Event = serde_json::from_str(S3_PUT_EVENT).unwrap();
        assert_eq!(event.records.len(), 1);

        let file = FileReference::from_s3_record(&event.records[0]).unwrap();
        assert_eq!(file.bucket, "sod-auctions");
        assert_eq!(file.key, "price-distributions/realm+5/2026-10-14%2006.csv");
        assert_eq!(file.event_name.as_deref(), Some("ObjectCreated:Put"));
        assert_eq!(file.region.as_deref(), Some("us-east-1"));
        assert_eq!(file.size, Some(1024));
        assert_eq!(
            file.decoded_key().unwrap(),
            "price-distributions/realm 5/2026-10-14 06.csv"
        );
    }

    #[test]
    fn test_query_unescape() {
        assert_eq!(query_unescape("plain.csv").unwrap(), "plain.csv");
        assert_eq!(query_unescape("a+b.csv").unwrap(), "a b.csv");
        assert_eq!(query_unescape("a%2Bb.csv").unwrap(), "a+b.csv");
        assert_eq!(query_unescape("dir%2ffile.csv").unwrap(), "dir/file.csv");
        assert_eq!(query_unescape("caf%C3%A9.csv").unwrap(), "café.csv");
    }

    #[test]
    fn test_query_unescape_rejects_malformed_escapes() {
        assert!(query_unescape("bad%zzkey.csv").is_err());
        assert!(query_unescape("truncated%2").is_err());
        assert!(query_unescape("trailing%").is_err());

        let err = query_unescape("not-utf8%FF.csv").unwrap_err();
        assert_eq!(err.key, "not-utf8%FF.csv");
        assert!(err.reason.contains("UTF-8"));
    }

    #[test]
    fn test_decoded_key_rejects_empty() {
        assert!(FileReference::new("bucket", "").decoded_key().is_err());
    }

    #[test]
    fn test_record_batch_len() {
        let batch = RecordBatch::new("file.csv", vec![PriceDistribution::new(1, 2, 3, 4, 5)]);
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert!(RecordBatch::default().is_empty());
    }
}
