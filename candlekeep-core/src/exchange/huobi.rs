//! Huobi spot adapter, storage id `huobipro`.
//!
//! The kline endpoint ignores any start time: it returns the most recent
//! `size` bars (150 by default, 2000 at most), newest first, with timestamps
//! in seconds. Rows older than `since` are dropped here, so only the last
//! 2000 bars of history are reachable.

use super::http::HttpClient;
use super::{split_symbol, ExchangeClient, ExchangeError};
use crate::domain::{Bar, Interval};
use serde::Deserialize;

const BASE_URL: &str = "https://api.huobi.pro";
const MAX_SIZE: u32 = 2000;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(rename = "err-code", default)]
    err_code: Option<String>,
    #[serde(rename = "err-msg", default)]
    err_msg: Option<String>,
    data: Option<Vec<T>>,
}

impl<T> Envelope<T> {
    fn into_data(self, symbol: Option<&str>) -> Result<Vec<T>, ExchangeError> {
        if self.status == "ok" {
            return Ok(self.data.unwrap_or_default());
        }
        let code = self.err_code.unwrap_or_else(|| self.status.clone());
        let message = self.err_msg.unwrap_or_default();
        match symbol {
            Some(symbol) if message.contains("invalid symbol") => {
                Err(ExchangeError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            _ => Err(ExchangeError::Exchange { code, message }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    #[serde(rename = "base-currency")]
    base: String,
    #[serde(rename = "quote-currency")]
    quote: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct Kline {
    /// Open time in seconds.
    id: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    /// Base-asset volume (`vol` is quote-asset turnover).
    amount: f64,
}

pub struct HuobiClient {
    http: HttpClient,
    base_url: String,
}

impl HuobiClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `BTC/USDT` → `btcusdt`.
    fn market_id(symbol: &str) -> Result<String, ExchangeError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{base}{quote}").to_lowercase())
    }

    fn period(interval: Interval) -> Option<&'static str> {
        match interval {
            Interval::M1 => Some("1min"),
            Interval::M5 => Some("5min"),
            Interval::M15 => Some("15min"),
            Interval::M30 => Some("30min"),
            Interval::H1 => Some("60min"),
            Interval::H4 => Some("4hour"),
            Interval::D1 => Some("1day"),
            Interval::W1 => Some("1week"),
            Interval::M3 | Interval::H2 | Interval::H6 | Interval::H12 => None,
        }
    }

    fn parse_symbols(symbols: Vec<SymbolInfo>) -> Vec<String> {
        symbols
            .into_iter()
            .filter(|s| s.state == "online")
            .map(|s| format!("{}/{}", s.base.to_uppercase(), s.quote.to_uppercase()))
            .collect()
    }

    /// Ascending bars at or after `since`, at most `limit` of them.
    fn select_rows(klines: Vec<Kline>, since: i64, limit: usize) -> Vec<Bar> {
        let mut bars: Vec<Bar> = klines
            .into_iter()
            .map(|k| Bar::new(k.id * 1000, k.open, k.high, k.low, k.close, k.amount))
            .filter(|b| b.timestamp >= since)
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        bars.truncate(limit);
        bars
    }
}

impl ExchangeClient for HuobiClient {
    fn id(&self) -> &str {
        "huobipro"
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        let url = format!("{}/v1/common/symbols", self.base_url);
        let envelope: Envelope<SymbolInfo> = self.http.get_json(&url, &[])?;
        Ok(Self::parse_symbols(envelope.into_data(None)?))
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let period = Self::period(interval).ok_or_else(|| ExchangeError::UnsupportedInterval {
            exchange: self.id().to_string(),
            interval,
        })?;
        let url = format!("{}/market/history/kline", self.base_url);
        let mut query = vec![
            ("symbol", Self::market_id(symbol)?),
            ("period", period.to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("size", limit.clamp(1, MAX_SIZE).to_string()));
        }

        let envelope: Envelope<Kline> = self.http.get_json(&url, &query)?;
        let klines = envelope.into_data(Some(symbol))?;
        let cap = limit.map_or(usize::MAX, |l| l as usize);
        Ok(Self::select_rows(klines, since, cap))
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
