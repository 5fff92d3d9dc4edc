//! OKX spot adapter (`/api/v5`), storage id `okex`.
//!
//! OKX has no `startTime` parameter. A page starting at `since` is requested as
//! the open window `(since - 1, since + limit * interval)` via the `before` and
//! `after` cursors, at most 100 rows, returned newest first.
//!
//! A fixed window can land entirely inside a gap (listing later in the day,
//! maintenance, no trades). Windows that come back with at most one row are
//! followed by the next window until bars appear, the scan has covered one
//! day past `since`, or the window reaches the present.

use super::http::HttpClient;
use super::{parse_decimal, split_symbol, ExchangeClient, ExchangeError};
use crate::domain::{Bar, Interval, DAY_MS};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

const BASE_URL: &str = "https://www.okx.com";
const MAX_LIMIT: u32 = 100;
const INSTRUMENT_NOT_FOUND: &str = "51001";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, symbol: Option<&str>) -> Result<Vec<T>, ExchangeError> {
        match (self.code.as_str(), symbol) {
            ("0", _) => Ok(self.data),
            (INSTRUMENT_NOT_FOUND, Some(symbol)) => Err(ExchangeError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            _ => Err(ExchangeError::Exchange {
                code: self.code,
                message: self.msg,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    base_ccy: String,
    quote_ccy: String,
    state: String,
}

/// `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, all strings.
type CandleRow = Vec<String>;

pub struct OkxClient {
    http: HttpClient,
    base_url: String,
}

impl OkxClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `BTC/USDT` → `BTC-USDT`.
    fn inst_id(symbol: &str) -> Result<String, ExchangeError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{base}-{quote}"))
    }

    /// Bars of six hours and longer use the UTC-aligned variants so daily
    /// candles open at 00:00 UTC rather than Hong Kong midnight.
    fn bar_param(interval: Interval) -> &'static str {
        match interval {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1H",
            Interval::H2 => "2H",
            Interval::H4 => "4H",
            Interval::H6 => "6Hutc",
            Interval::H12 => "12Hutc",
            Interval::D1 => "1Dutc",
            Interval::W1 => "1Wutc",
        }
    }

    /// `(before, after)` cursors selecting `[since, since + limit * interval)`.
    fn window(since: i64, interval: Interval, limit: u32) -> (i64, i64) {
        (since - 1, since + i64::from(limit) * interval.duration_ms())
    }

    /// Where the gap scan stops: one day past `since`, capped at `now`.
    fn scan_horizon(since: i64, now: i64) -> i64 {
        (since + DAY_MS).min(now)
    }

    fn fetch_window(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        limit: u32,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let url = format!("{}/api/v5/market/history-candles", self.base_url);
        let (before, after) = Self::window(start, interval, limit);
        let query = [
            ("instId", Self::inst_id(symbol)?),
            ("bar", Self::bar_param(interval).to_string()),
            ("before", before.to_string()),
            ("after", after.to_string()),
            ("limit", limit.to_string()),
        ];

        let envelope: Envelope<CandleRow> = self
            .http
            .get_json(&url, &query)
            .map_err(|e| Self::map_error(symbol, e))?;
        Self::parse_candles(envelope.into_data(Some(symbol))?)
    }

    /// OKX also reports unknown instruments with HTTP 400 and the envelope as body.
    fn map_error(symbol: &str, err: ExchangeError) -> ExchangeError {
        match err {
            ExchangeError::Exchange { message, .. } if message.contains(INSTRUMENT_NOT_FOUND) => {
                ExchangeError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            }
            other => other,
        }
    }

    fn parse_instruments(instruments: Vec<Instrument>) -> Vec<String> {
        instruments
            .into_iter()
            .filter(|i| i.state == "live")
            .map(|i| format!("{}/{}", i.base_ccy, i.quote_ccy))
            .collect()
    }

    fn parse_candles(rows: Vec<CandleRow>) -> Result<Vec<Bar>, ExchangeError> {
        let mut bars = rows
            .iter()
            .map(|row| {
                if row.len() < 6 {
                    return Err(ExchangeError::ResponseFormatChanged(format!(
                        "candle row has {} fields, expected at least 6",
                        row.len()
                    )));
                }
                let timestamp = row[0].parse::<i64>().map_err(|e| {
                    ExchangeError::ResponseFormatChanged(format!("bad ts '{}': {e}", row[0]))
                })?;
                Ok(Bar::new(
                    timestamp,
                    parse_decimal("open", &row[1])?,
                    parse_decimal("high", &row[2])?,
                    parse_decimal("low", &row[3])?,
                    parse_decimal("close", &row[4])?,
                    parse_decimal("volume", &row[5])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl ExchangeClient for OkxClient {
    fn id(&self) -> &str {
        "okex"
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        let url = format!("{}/api/v5/public/instruments", self.base_url);
        let envelope: Envelope<Instrument> = self
            .http
            .get_json(&url, &[("instType", "SPOT".to_string())])?;
        Ok(Self::parse_instruments(envelope.into_data(None)?))
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let limit = limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT);
        let horizon = Self::scan_horizon(since, Utc::now().timestamp_millis());

        let mut bars = Vec::new();
        let mut start = since;
        loop {
            bars.extend(self.fetch_window(symbol, interval, start, limit)?);
            let (_, window_end) = Self::window(start, interval, limit);
            if bars.len() > 1 || window_end >= horizon {
                break;
            }
            debug!(symbol, start, window_end, rows = bars.len(), "window in a gap, moving on");
            start = window_end;
        }

        bars.truncate(limit as usize);
        Ok(bars)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
