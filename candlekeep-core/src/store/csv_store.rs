//! CSV store with an exchange / market / day directory layout.
//!
//! Layout: `{root}/{exchange}/spot/{YYYY-MM-DD}/{BASE-QUOTE}_{interval}.csv`
//!
//! - Empty sequences are never written
//! - Writes are atomic (write to `.tmp`, flush, rename into place)
//! - An existing file is replaced, never merged

use super::StoreError;
use crate::domain::{Bar, Interval};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

/// The only market type this tool collects.
pub const SPOT_MARKET: &str = "spot";

const HEADER: [&str; 6] = ["candle_begin_time", "open", "high", "low", "close", "volume"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for a symbol and interval: `BTC/USDT`, `5m` → `BTC-USDT_5m.csv`.
    pub fn file_name(symbol: &str, interval: Interval) -> String {
        format!("{}_{}.csv", symbol.replace('/', "-"), interval)
    }

    /// Where a day's bars live. Pure; touches nothing on disk.
    pub fn path_for(
        &self,
        exchange_id: &str,
        market: &str,
        day: NaiveDate,
        symbol: &str,
        interval: Interval,
    ) -> PathBuf {
        self.root
            .join(exchange_id)
            .join(market)
            .join(day.to_string())
            .join(Self::file_name(symbol, interval))
    }

    /// Persist a finalized spot bar sequence.
    ///
    /// Returns the written path, or `None` when `bars` is empty (nothing is
    /// created, not even the directories).
    pub fn write(
        &self,
        exchange_id: &str,
        day: NaiveDate,
        symbol: &str,
        interval: Interval,
        bars: &[Bar],
    ) -> Result<Option<PathBuf>, StoreError> {
        if bars.is_empty() {
            return Ok(None);
        }

        let path = self.path_for(exchange_id, SPOT_MARKET, day, symbol, interval);
        if let Some(dir) = path.parent() {
            ensure_dir(dir)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        if let Err(e) = write_csv(&tmp_path, bars) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io {
                path: path.clone(),
                source,
            }
        })?;

        Ok(Some(path))
    }

    /// Read a file written by [`CsvStore::write`] back into bars.
    pub fn load(path: &Path) -> Result<Vec<Bar>, StoreError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;

        let headers = reader.headers().map_err(|e| StoreError::csv(path, e))?;
        if headers.iter().ne(HEADER) {
            return Err(StoreError::Format {
                path: path.to_path_buf(),
                message: format!("unexpected header {headers:?}"),
            });
        }

        let mut bars = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StoreError::csv(path, e))?;
            let bad_row = |message: String| StoreError::Format {
                path: path.to_path_buf(),
                message: format!("row {}: {message}", line + 1),
            };

            let time = NaiveDateTime::parse_from_str(&record[0], TIME_FORMAT)
                .map_err(|e| bad_row(format!("candle_begin_time '{}': {e}", &record[0])))?;
            let mut values = [0.0_f64; 5];
            for (i, value) in values.iter_mut().enumerate() {
                *value = record[i + 1]
                    .parse()
                    .map_err(|e| bad_row(format!("{} '{}': {e}", HEADER[i + 1], &record[i + 1])))?;
            }
            let [open, high, low, close, volume] = values;
            bars.push(Bar::new(
                time.and_utc().timestamp_millis(),
                open,
                high,
                low,
                close,
                volume,
            ));
        }
        Ok(bars)
    }
}

/// Create `dir` and its parents if missing. Safe to call repeatedly.
pub fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// `candle_begin_time` as written to disk (UTC, second precision).
pub fn format_candle_time(timestamp_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.format(TIME_FORMAT).to_string())
}

fn write_csv(path: &Path, bars: &[Bar]) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    wtr.write_record(HEADER).map_err(|e| StoreError::csv(path, e))?;

    for bar in bars {
        let time = format_candle_time(bar.timestamp).ok_or_else(|| StoreError::Format {
            path: path.to_path_buf(),
            message: format!("timestamp out of range: {}", bar.timestamp),
        })?;
        wtr.write_record([
            time,
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(|e| StoreError::csv(path, e))?;
    }

    wtr.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
