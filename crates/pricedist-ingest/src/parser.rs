//! Record Parser
//!
//! Decodes a price distribution CSV stream into [`PriceDistribution`]s.
//!
//! # File Format
//! ```text
//! realmID,auctionHouseID,itemID,buyoutEach,quantity
//! 1,2,100,500,3
//! 1,2,101,250,10
//! ```
//!
//! The first line is a header and is discarded unread. Every later row must
//! carry at least five columns of signed base-10 integers; columns past the
//! fifth are ignored. One bad row fails the whole file.
//!
//! Rows are indexed by record, not by line: the header is row 0 and blank
//! lines are skipped without taking an index.

use std::fmt::Display;
use std::str::FromStr;

use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord, Trim};
use futures::Stream;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::ParseError;
use crate::models::{PriceDistribution, RecordBatch};

/// Number of leading columns mapped onto a record
pub const RECORD_COLUMNS: usize = 5;

/// Pull-based reader over one CSV stream
///
/// Records are decoded one at a time as they are requested. After the end of
/// the stream or the first error, every further call yields `None`.
pub struct PriceDistributionReader<R> {
    reader: AsyncReader<R>,
    record: ByteRecord,
    /// Record index of the last row read; the header is row 0
    row: usize,
    decoded: usize,
    header_read: bool,
    finished: bool,
}

impl<R> PriceDistributionReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(input: R) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::None)
            .create_reader(input);

        Self {
            reader,
            record: ByteRecord::new(),
            row: 0,
            decoded: 0,
            header_read: false,
            finished: false,
        }
    }

    /// Consume the header line without looking at its content
    pub async fn read_header(&mut self) -> Result<(), ParseError> {
        if self.header_read {
            return Ok(());
        }

        match self.reader.read_byte_record(&mut self.record).await {
            Ok(true) => {
                self.header_read = true;
                Ok(())
            },
            Ok(false) => {
                self.finished = true;
                Err(ParseError::HeaderMissing { source: None })
            },
            Err(e) => {
                self.finished = true;
                Err(ParseError::HeaderMissing { source: Some(e) })
            },
        }
    }

    /// Decode the next data row, or `None` at end of stream
    pub async fn next_record(&mut self) -> Result<Option<PriceDistribution>, ParseError> {
        if self.finished {
            return Ok(None);
        }

        self.read_header().await?;

        let row = self.row + 1;
        let has_row = match self.reader.read_byte_record(&mut self.record).await {
            Ok(has_row) => has_row,
            Err(e) => {
                self.finished = true;
                return Err(if e.is_io_error() {
                    ParseError::Read { row, source: e }
                } else {
                    ParseError::RowMalformed {
                        row,
                        content: String::new(),
                        reason: e.to_string(),
                    }
                });
            },
        };

        if !has_row {
            self.finished = true;
            return Ok(None);
        }

        self.row = row;
        match map_row(&self.record) {
            Ok(record) => {
                self.decoded += 1;
                Ok(Some(record))
            },
            Err(reason) => {
                self.finished = true;
                Err(ParseError::RowMalformed {
                    row,
                    content: raw_content(&self.record),
                    reason,
                })
            },
        }
    }

    /// Number of data rows decoded so far
    pub fn rows_read(&self) -> usize {
        self.decoded
    }

    /// Turn the reader into a lazy stream of records
    pub fn into_stream(self) -> impl Stream<Item = Result<PriceDistribution, ParseError>> + Send {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_record().await?.map(|record| (record, reader)))
        })
    }
}

/// Decode a whole stream into one batch, failing on the first bad row
pub async fn parse_batch<R>(input: R, source_key: &str) -> Result<RecordBatch, ParseError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut reader = PriceDistributionReader::new(input);
    reader.read_header().await?;

    let mut records = Vec::new();
    while let Some(record) = reader.next_record().await? {
        records.push(record);
    }

    debug!(rows = records.len(), key = %source_key, "Parsed price distribution file");

    Ok(RecordBatch::new(source_key, records))
}

fn map_row(record: &ByteRecord) -> Result<PriceDistribution, String> {
    if record.len() < RECORD_COLUMNS {
        return Err(format!(
            "expected at least {} columns, found {}",
            RECORD_COLUMNS,
            record.len()
        ));
    }

    Ok(PriceDistribution {
        realm_id: parse_column(record, 0, "realmID")?,
        auction_house_id: parse_column(record, 1, "auctionHouseID")?,
        item_id: parse_column(record, 2, "itemID")?,
        buyout_each: parse_column(record, 3, "buyoutEach")?,
        quantity: parse_column(record, 4, "quantity")?,
    })
}

fn parse_column<T>(record: &ByteRecord, index: usize, name: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = record
        .get(index)
        .ok_or_else(|| format!("missing {} column", name))?;
    let text = std::str::from_utf8(raw).map_err(|_| format!("{} is not valid UTF-8", name))?;
    text.parse()
        .map_err(|e| format!("could not parse {} '{}': {}", name, text, e))
}

fn raw_content(record: &ByteRecord) -> String {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(",")
}
