//! Mock exchanges shared by the integration tests.

#![allow(dead_code)]

pub mod http_stub;

use candlekeep_core::domain::{day_start_ms, Bar, Interval};
use candlekeep_core::exchange::{ExchangeClient, ExchangeError};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const FIVE_MIN: i64 = 300_000;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar(ts: i64, close: f64) -> Bar {
    Bar::new(ts, close, close + 1.0, close - 1.0, close, 10.0)
}

/// `count` bars every `step` ms starting at `start`, closes counting up from `first_close`.
pub fn run_of_bars(start: i64, step: i64, count: usize, first_close: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| bar(start + step * i as i64, first_close + i as f64))
        .collect()
}

/// One recorded `fetch_ohlcv` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub symbol: String,
    pub interval: Interval,
    pub since: i64,
    pub limit: Option<u32>,
}

/// Replays pre-built pages in order, whatever `since` is asked for.
pub struct ScriptedExchange {
    id: String,
    symbols: Vec<String>,
    pages: Mutex<VecDeque<Result<Vec<Bar>, ExchangeError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExchange {
    pub fn new(id: &str, pages: Vec<Vec<Bar>>) -> Self {
        Self {
            id: id.to_string(),
            symbols: vec!["BTC/USDT".into()],
            pages: Mutex::new(pages.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, error: ExchangeError) {
        self.pages.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExchangeClient for ScriptedExchange {
    fn id(&self) -> &str {
        &self.id
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        Ok(self.symbols.clone())
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        self.calls.lock().unwrap().push(Call {
            symbol: symbol.to_string(),
            interval,
            since,
            limit,
        });
        // Script exhausted: behave like an exchange with nothing left.
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Serves a fixed bar history the way a real paged endpoint does: up to
/// `page_size` bars with `timestamp >= since`.
pub struct HistoryExchange {
    id: String,
    symbols: Result<Vec<String>, String>,
    history: Vec<Bar>,
    page_size: usize,
    /// Requests whose `since` falls on one of these days fail.
    failing_days: Vec<NaiveDate>,
    /// Requests for these symbols fail.
    failing_symbols: Vec<String>,
    calls: Mutex<Vec<Call>>,
}

impl HistoryExchange {
    /// Continuous 5m bars from `first_day` 00:00 through the end of `last_day`.
    pub fn five_minute(id: &str, first_day: NaiveDate, last_day: NaiveDate, page_size: usize) -> Self {
        let start = day_start_ms(first_day);
        let end = day_start_ms(last_day) + 86_400_000;
        let count = ((end - start) / FIVE_MIN) as usize;
        Self {
            id: id.to_string(),
            symbols: Ok(vec!["BTC/USDT".into(), "ETH/USDT".into(), "ETH/BTC".into()]),
            history: run_of_bars(start, FIVE_MIN, count, 100.0),
            page_size,
            failing_days: Vec::new(),
            failing_symbols: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_symbols(mut self, symbols: &[&str]) -> Self {
        self.symbols = Ok(symbols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_listing_failure(mut self, message: &str) -> Self {
        self.symbols = Err(message.to_string());
        self
    }

    pub fn failing_on_day(mut self, day: NaiveDate) -> Self {
        self.failing_days.push(day);
        self
    }

    pub fn failing_for_symbol(mut self, symbol: &str) -> Self {
        self.failing_symbols.push(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExchangeClient for HistoryExchange {
    fn id(&self) -> &str {
        &self.id
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        self.symbols
            .clone()
            .map_err(ExchangeError::NetworkUnreachable)
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        self.calls.lock().unwrap().push(Call {
            symbol: symbol.to_string(),
            interval,
            since,
            limit,
        });

        if self.failing_symbols.iter().any(|s| s == symbol) {
            return Err(ExchangeError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let since_day = chrono::DateTime::from_timestamp_millis(since).map(|dt| dt.date_naive());
        if since_day.is_some_and(|d| self.failing_days.contains(&d)) {
            return Err(ExchangeError::NetworkUnreachable("connection reset".into()));
        }

        let size = limit.map_or(self.page_size, |l| (l as usize).min(self.page_size));
        Ok(self
            .history
            .iter()
            .filter(|b| b.timestamp >= since)
            .take(size)
            .copied()
            .collect())
    }
}

/// Lets a test keep a handle on a mock after handing a boxed client to the driver.
pub struct Shared<T>(pub Arc<T>);

impl<T: ExchangeClient> Shared<T> {
    pub fn boxed(inner: &Arc<T>) -> Box<dyn ExchangeClient>
    where
        T: 'static,
    {
        Box::new(Shared(Arc::clone(inner)))
    }
}

impl<T: ExchangeClient> ExchangeClient for Shared<T> {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn list_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        self.0.list_symbols()
    }

    fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: Interval,
        since: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Bar>, ExchangeError> {
        self.0.fetch_ohlcv(symbol, interval, since, limit)
    }

    fn is_available(&self) -> bool {
        self.0.is_available()
    }
}
