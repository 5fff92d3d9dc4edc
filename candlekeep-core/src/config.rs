//! Run configuration: which exchanges, symbols, intervals and days to fetch,
//! and where to put the files.
//!
//! Built once (from TOML, CLI flags, or both), validated, then handed to the
//! batch driver as a [`BatchPlan`].

use crate::domain::Interval;
use crate::exchange::{ExchangeId, HttpOptions};
use crate::fetch::BatchPlan;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUOTE_ASSET: &str = "USDT";
pub const DEFAULT_OUTPUT_DIR: &str = "data/history_candle_data";
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;
/// Huobi returns 150 bars unless asked for more.
pub const HUOBI_PAGE_LIMIT: u32 = 2000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which calendar days (UTC) to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "DaysTable", into = "DaysTable")]
pub enum DaySelection {
    /// The most recently completed UTC day.
    #[default]
    Yesterday,
    Single(NaiveDate),
    /// Inclusive on both ends.
    Range { start: NaiveDate, end: NaiveDate },
}

impl DaySelection {
    /// Expand into concrete days, `today` being the current UTC date.
    pub fn days(&self, today: NaiveDate) -> Result<Vec<NaiveDate>, ConfigError> {
        match *self {
            DaySelection::Yesterday => today
                .pred_opt()
                .map(|d| vec![d])
                .ok_or_else(|| ConfigError::Invalid(format!("no day before {today}"))),
            DaySelection::Single(day) => Ok(vec![day]),
            DaySelection::Range { start, end } => {
                if start > end {
                    return Err(ConfigError::Invalid(format!(
                        "day range start {start} is after end {end}"
                    )));
                }
                Ok(start.iter_days().take_while(|d| *d <= end).collect())
            }
        }
    }
}

/// `[days]` as written in TOML: `day = ...` or `start = ...` + `end = ...`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DaysTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDate>,
}

impl TryFrom<DaysTable> for DaySelection {
    type Error = String;

    fn try_from(table: DaysTable) -> Result<Self, Self::Error> {
        match (table.day, table.start, table.end) {
            (None, None, None) => Ok(DaySelection::Yesterday),
            (Some(day), None, None) => Ok(DaySelection::Single(day)),
            (None, Some(start), Some(end)) => Ok(DaySelection::Range { start, end }),
            (Some(_), _, _) => Err("use either `day` or `start`/`end`, not both".into()),
            _ => Err("`start` and `end` must be given together".into()),
        }
    }
}

impl From<DaySelection> for DaysTable {
    fn from(selection: DaySelection) -> Self {
        match selection {
            DaySelection::Yesterday => DaysTable::default(),
            DaySelection::Single(day) => DaysTable {
                day: Some(day),
                ..DaysTable::default()
            },
            DaySelection::Range { start, end } => DaysTable {
                start: Some(start),
                end: Some(end),
                ..DaysTable::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub exchanges: Vec<ExchangeId>,
    /// Suffix filter on unified symbols; `USDT` keeps `BTC/USDT`.
    pub quote_asset: String,
    /// Explicit symbols. When absent every listed symbol is considered.
    pub symbols: Option<Vec<String>>,
    pub intervals: Vec<Interval>,
    pub days: DaySelection,
    pub output_dir: PathBuf,
    /// Courtesy delay between consecutive exchange requests.
    pub page_delay_ms: u64,
    /// Rows per page keyed by exchange id; missing means the exchange default.
    pub page_limits: BTreeMap<String, u32>,
    pub http: HttpOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exchanges: ExchangeId::ALL.to_vec(),
            quote_asset: DEFAULT_QUOTE_ASSET.to_string(),
            symbols: None,
            intervals: vec![Interval::M5, Interval::M15],
            days: DaySelection::Yesterday,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            page_limits: BTreeMap::from([(
                ExchangeId::Huobi.as_str().to_string(),
                HUOBI_PAGE_LIMIT,
            )]),
            http: HttpOptions::default(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate. Keys left out take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.exchanges.is_empty() {
            return invalid("at least one exchange is required".into());
        }
        if self.intervals.is_empty() {
            return invalid("at least one interval is required".into());
        }
        if let Some(symbols) = &self.symbols {
            if symbols.is_empty() {
                return invalid("`symbols` is present but empty".into());
            }
            if let Some(bad) = symbols.iter().find(|s| !is_unified_symbol(s)) {
                return invalid(format!("symbol '{bad}' is not in BASE/QUOTE form"));
            }
        }
        if self.quote_asset.contains('/') {
            return invalid(format!("quote asset '{}' contains '/'", self.quote_asset));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.exchanges.iter().find(|e| !seen.insert(**e)) {
            return invalid(format!("exchange '{dup}' listed twice"));
        }

        for (exchange, rows) in &self.page_limits {
            if !ExchangeId::ALL.iter().any(|id| id.as_str() == exchange.as_str()) {
                return invalid(format!("page limit for unknown exchange '{exchange}'"));
            }
            if *rows == 0 {
                return invalid(format!("page limit for '{exchange}' must be positive"));
            }
        }

        if let DaySelection::Range { start, end } = self.days {
            if start > end {
                return invalid(format!("day range start {start} is after end {end}"));
            }
        }

        if self.http.timeout_secs == 0 {
            return invalid("http.timeout_secs must be positive".into());
        }

        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Resolve days against `today` and produce the driver's plan.
    pub fn plan(&self, today: NaiveDate) -> Result<BatchPlan, ConfigError> {
        Ok(BatchPlan {
            quote_asset: self.quote_asset.clone(),
            symbols: self.symbols.clone(),
            intervals: self.intervals.clone(),
            days: self.days.days(today)?,
            page_limits: self.page_limits.clone(),
        })
    }
}

fn is_unified_symbol(symbol: &str) -> bool {
    symbol
        .split_once('/')
        .is_some_and(|(base, quote)| !base.is_empty() && !quote.is_empty() && !quote.contains('/'))
}
