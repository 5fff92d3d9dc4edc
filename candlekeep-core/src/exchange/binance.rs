//! Binance spot adapter (`/api/v3`).
//!
//! Binance honours `startTime` directly, returns up to 500 rows by default
//! and at most 1000 per request, oldest first.

use super::http::HttpClient;
use super::{parse_decimal, split_symbol, ExchangeClient, ExchangeError};
use crate::domain::{Bar, Interval};
use serde::Deserialize;
use serde_json::Value;

const BASE_URL: &str = "https://api.binance.com";
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

pub struct BinanceClient {
    http: HttpClient,
    base_url: String,
}

impl BinanceClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `BTC/USDT` → `BTCUSDT`.
    fn market_id(symbol: &str) -> Result<String, ExchangeError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{base}{quote}"))
    }

    fn parse_symbols(info: ExchangeInfo) -> Vec<String> {
        info.symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| format!("{}/{}", s.base_asset, s.quote_asset))
            .collect()
    }

    /// Kline rows: `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
    fn parse_klines(rows: Vec<Vec<Value>>) -> Result<Vec<Bar>, ExchangeError> {
        rows.iter()
            .map(|row| {
                if row.len() < 6 {
                    return Err(ExchangeError::ResponseFormatChanged(format!(
                        "kline row has {} fields, expected at least 6",
                        row.len()
                    )));
                }
                let timestamp = row[0].as_i64().ok_or_else(|| {
                    ExchangeError::ResponseFormatChanged(format!("bad open_time: {}", row[0]))
                })?;
                Ok(Bar::new(
                    timestamp,
                    decimal_field("open", &row[1])?,
                    decimal_field("high", &row[2])?,
                    decimal_field("low", &row[3])?,
                    decimal_field("close", &row[4])?,
                    decimal_field("volume", &row[5])?,
                ))
            })
            .collect()
    }

    fn map_error(symbol: &str, err: ExchangeError) -> ExchangeError {
        match err {
            ExchangeError::Exchange { message, .. } if message.contains("-1121") => {
                ExchangeError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            }
            other => other,
        }
    }
}

fn decimal_field(field: &str, value: &Value) -> Result<f64, ExchangeError> {
    match value {
        Value::String(s) => parse_decimal(field, s),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            ExchangeError::ResponseFormatChanged(format!("{field} out of range: {n}"))
        }),
        other => Err(ExchangeError::ResponseFormatChanged(format!(
            "unexpected {field} value: {other}"
        ))),
    }
}

impl ExchangeClient for BinanceClient {
    fn id(&self) -> &str {
        "binance"
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let info: ExchangeInfo = self.http.get_json(&url, &[])?;
        Ok(Self::parse_symbols(info))
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut query = vec![
            ("symbol", Self::market_id(symbol)?),
            ("interval", interval.as_str().to_string()),
            ("startTime", since.to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.min(MAX_LIMIT).to_string()));
        }

        let rows: Vec<Vec<Value>> = self
            .http
            .get_json(&url, &query)
            .map_err(|e| Self::map_error(symbol, e))?;
        Self::parse_klines(rows)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
