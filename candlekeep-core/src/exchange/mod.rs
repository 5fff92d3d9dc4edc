//! Exchange client trait and structured error types.
//!
//! The `ExchangeClient` trait abstracts over spot exchanges (Binance, OKX, Huobi)
//! so the day fetcher and batch driver never see HTTP details, and tests can
//! drive them with scripted pages.

pub mod binance;
pub mod circuit_breaker;
pub mod http;
pub mod huobi;
pub mod okx;

use crate::domain::{Bar, Interval};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use binance::BinanceClient;
pub use circuit_breaker::CircuitBreaker;
pub use http::{HttpClient, HttpOptions};
pub use huobi::HuobiClient;
pub use okx::OkxClient;

/// Structured error types for exchange requests.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by exchange (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("hard stop: exchange has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("interval {interval} is not supported by {exchange}")]
    UnsupportedInterval {
        exchange: String,
        interval: Interval,
    },

    #[error("exchange error {code}: {message}")]
    Exchange { code: String, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("pagination stalled for {symbol} after {pages} pages")]
    PaginationStalled { symbol: String, pages: usize },

    #[error("exchange error: {0}")]
    Other(String),
}

/// Capability object for one spot exchange.
///
/// Implementations are blocking. Rate-limit pacing between requests is the
/// caller's job (see [`crate::fetch::Pacer`]); implementations may retry a
/// single request internally.
pub trait ExchangeClient: Send + Sync {
    /// Stable identifier, used as the top-level storage directory.
    fn id(&self) -> &str;

    /// Tradable spot symbols in unified `BASE/QUOTE` form.
    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError>;

    /// Up to `limit` bars with `timestamp >= since`, ascending.
    ///
    /// `limit = None` lets the exchange pick its default page size. Fewer rows
    /// than requested (including none) means the exchange has nothing more.
    /// Adapters whose endpoint only answers fixed time windows must look past
    /// gaps for at least one day after `since` before returning one row or none.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError>;

    /// Convert an ISO-8601 string into the epoch-millisecond cursor format.
    ///
    /// Strings without an offset are read as UTC.
    fn parse_timestamp(&self, iso: &str) -> Result<i64, ExchangeError> {
        parse_iso8601_ms(iso)
    }

    /// False while the client refuses requests (circuit breaker open).
    fn is_available(&self) -> bool {
        true
    }
}

/// Default ISO-8601 parser: RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM:SS[.f]` read as UTC.
pub fn parse_iso8601_ms(iso: &str) -> Result<i64, ExchangeError> {
    let s = iso.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| ExchangeError::InvalidTimestamp(s.to_string()))
}

/// Exchanges with a built-in HTTP adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExchangeId {
    Binance,
    Okx,
    Huobi,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 3] = [ExchangeId::Okx, ExchangeId::Huobi, ExchangeId::Binance];

    /// Identifier used in storage paths and page-limit overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Okx => "okex",
            ExchangeId::Huobi => "huobipro",
        }
    }

    /// Build the HTTP adapter for this exchange.
    pub fn connect(&self, options: &HttpOptions) -> Result<Box<dyn ExchangeClient>, ExchangeError> {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let http = HttpClient::new(options, breaker)?;
        Ok(match self {
            ExchangeId::Binance => Box::new(BinanceClient::new(http)),
            ExchangeId::Okx => Box::new(OkxClient::new(http)),
            ExchangeId::Huobi => Box::new(HuobiClient::new(http)),
        })
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(ExchangeId::Binance),
            "okex" | "okx" => Ok(ExchangeId::Okx),
            "huobipro" | "huobi" | "htx" => Ok(ExchangeId::Huobi),
            other => Err(format!(
                "unknown exchange '{other}' (expected binance, okex or huobipro)"
            )),
        }
    }
}

impl TryFrom<String> for ExchangeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExchangeId> for String {
    fn from(value: ExchangeId) -> Self {
        value.as_str().to_string()
    }
}

/// Split a unified `BASE/QUOTE` symbol.
pub(crate) fn split_symbol(symbol: &str) -> Result<(&str, &str), ExchangeError> {
    symbol
        .split_once('/')
        .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
        .ok_or_else(|| ExchangeError::SymbolNotFound {
            symbol: symbol.to_string(),
        })
}

/// Parse an exchange's decimal string field.
pub(crate) fn parse_decimal(field: &str, value: &str) -> Result<f64, ExchangeError> {
    value.parse::<f64>().map_err(|e| {
        ExchangeError::ResponseFormatChanged(format!("failed to parse {field} '{value}': {e}"))
    })
}
