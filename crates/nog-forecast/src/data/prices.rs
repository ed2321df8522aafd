//! Daily price records and the on-disk price history cache

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Row layout of the cache file: `Date,Close,High,Low,Open,Volume`
#[derive(Debug, Serialize)]
struct CacheRowOut {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Lenient read layout: extra columns are ignored, empty cells become `None`
#[derive(Debug, Deserialize)]
struct CacheRowIn {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "Volume")]
    volume: Option<f64>,
}

/// Parse a cache date. Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_cache_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Create the parent directory of `path` if it has one
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Append-only CSV cache of the daily price history
#[derive(Debug, Clone)]
pub struct PriceCache {
    path: PathBuf,
}

impl PriceCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the full history
    ///
    /// A missing `Date` column, an unparsable date or non-increasing dates
    /// make the cache corrupt. Rows with an empty OHLCV cell are skipped.
    pub fn read(&self) -> Result<Vec<PriceRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        if !headers.iter().any(|h| h == "Date") {
            return Err(ForecastError::corrupt(&self.path, "missing Date column"));
        }

        let mut records: Vec<PriceRecord> = Vec::new();
        let mut skipped = 0usize;

        for (line, row) in reader.deserialize::<CacheRowIn>().enumerate() {
            let row = row.map_err(|e| {
                ForecastError::corrupt(&self.path, format!("row {}: {e}", line + 2))
            })?;

            let date = parse_cache_date(&row.date).ok_or_else(|| {
                ForecastError::corrupt(
                    &self.path,
                    format!("row {}: unparsable date '{}'", line + 2, row.date),
                )
            })?;

            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
                (row.open, row.high, row.low, row.close, row.volume)
            else {
                skipped += 1;
                continue;
            };

            if let Some(prev) = records.last() {
                if date <= prev.date {
                    return Err(ForecastError::corrupt(
                        &self.path,
                        format!("dates not strictly increasing at {date} (after {})", prev.date),
                    ));
                }
            }

            records.push(PriceRecord {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if skipped > 0 {
            warn!("Skipped {} incomplete rows in {}", skipped, self.path.display());
        }
        debug!("Read {} price rows from {}", records.len(), self.path.display());

        Ok(records)
    }

    /// Read the history restricted to an inclusive date range
    pub fn read_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>> {
        Ok(self
            .read()?
            .into_iter()
            .filter(|r| start.is_none_or(|s| r.date >= s) && end.is_none_or(|e| r.date <= e))
            .collect())
    }

    /// Date of the newest cached bar, `None` when the cache does not exist
    pub fn last_date(&self) -> Result<Option<NaiveDate>> {
        if !self.exists() {
            return Ok(None);
        }
        Ok(self.read()?.last().map(|r| r.date))
    }

    /// Rewrite the cache file with the fixed column order
    pub fn write(&self, records: &[PriceRecord]) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let mut writer = csv::Writer::from_path(&self.path)?;
        for r in records {
            writer.serialize(CacheRowOut {
                date: r.date.format("%Y-%m-%d").to_string(),
                close: r.close,
                high: r.high,
                low: r.low,
                open: r.open,
                volume: r.volume,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append bars newer than the last cached date and rewrite the file
    ///
    /// Existing rows are never modified; bars at or before the last cached
    /// date are ignored. Returns the number of rows appended.
    pub fn append(&self, new_records: &[PriceRecord]) -> Result<usize> {
        let mut records = if self.exists() { self.read()? } else { Vec::new() };
        let last = records.last().map(|r| r.date);

        let mut fresh: Vec<PriceRecord> = new_records
            .iter()
            .filter(|r| last.is_none_or(|l| r.date > l))
            .copied()
            .collect();
        fresh.sort_by_key(|r| r.date);
        fresh.dedup_by_key(|r| r.date);

        if fresh.is_empty() {
            return Ok(0);
        }

        let appended = fresh.len();
        records.extend(fresh);
        self.write(&records)?;
        info!("Appended {} rows to {}", appended, self.path.display());
        Ok(appended)
    }
}
