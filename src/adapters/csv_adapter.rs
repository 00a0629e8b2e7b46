//! CSV market data adapter.
//!
//! One file per asset, `{data_dir}/{ASSET}.csv`. The first column is the
//! timestamp (`YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`);
//! the price is read from a `price` column, falling back to `close`.
//! Rows are pulled lazily, one per `next_bar` call.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::data_port::{Feed, MarketDataPort};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn csv_path(data_dir: &Path, asset: &str) -> PathBuf {
    data_dir.join(format!("{}.csv", asset.to_uppercase()))
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub struct CsvMarketData<R: Read = File> {
    asset: String,
    source: String,
    reader: csv::Reader<R>,
    price_column: usize,
    record: StringRecord,
    row: usize,
}

impl CsvMarketData<File> {
    pub fn open(path: &Path, asset: &str) -> Result<Self, EngineError> {
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file, asset, &path.display().to_string())
    }

    pub fn for_asset(data_dir: &Path, asset: &str) -> Result<Self, EngineError> {
        Self::open(&csv_path(data_dir, asset), asset)
    }
}

impl<R: Read> CsvMarketData<R> {
    pub fn from_reader(reader: R, asset: &str, source: &str) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(std::io::Error::other)?;
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let price_column = column("price")
            .or_else(|| column("close"))
            .filter(|&idx| idx > 0)
            .ok_or_else(|| {
                EngineError::validation(format!("{source}: no price or close column"))
            })?;

        Ok(Self {
            asset: asset.to_uppercase(),
            source: source.to_string(),
            reader,
            price_column,
            record: StringRecord::new(),
            row: 0,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Drain the remaining rows. Any error, recoverable or not, is returned.
    pub fn read_all(mut self) -> Result<Vec<Bar>, EngineError> {
        let mut bars = Vec::new();
        while let Feed::Bar(bar) = self.next_bar()? {
            bars.push(bar);
        }
        Ok(bars)
    }
}

impl<R: Read> MarketDataPort for CsvMarketData<R> {
    fn next_bar(&mut self) -> Result<Feed, EngineError> {
        let more = match self.reader.read_record(&mut self.record) {
            Ok(more) => more,
            Err(e) if e.is_io_error() => return Err(std::io::Error::other(e).into()),
            Err(e) => {
                self.row += 1;
                return Err(EngineError::validation(format!(
                    "{} row {}: {}",
                    self.source, self.row, e
                )));
            }
        };
        if !more {
            return Ok(Feed::EndOfStream);
        }
        self.row += 1;

        let timestamp = match self.record.get(0).filter(|s| !s.is_empty()) {
            None => {
                return Err(EngineError::DataGap {
                    asset: self.asset.clone(),
                    reason: format!("{} row {}: missing timestamp", self.source, self.row),
                })
            }
            Some(raw) => parse_timestamp(raw).ok_or_else(|| EngineError::DataGap {
                asset: self.asset.clone(),
                reason: format!("{} row {}: unreadable timestamp '{}'", self.source, self.row, raw),
            })?,
        };

        let raw_price = self.record.get(self.price_column).unwrap_or("");
        let price: f64 = raw_price.parse().map_err(|_| {
            EngineError::validation(format!(
                "{} row {}: invalid price '{}'",
                self.source, self.row, raw_price
            ))
        })?;

        Ok(Feed::Bar(Bar::new(self.asset.clone(), timestamp, price)))
    }
}
