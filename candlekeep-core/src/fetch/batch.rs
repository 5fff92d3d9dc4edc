//! Batch driver: runs the day fetcher and the CSV store over every
//! exchange × symbol × interval × day combination, recording failures
//! instead of stopping.

use super::day::DayFetcher;
use super::progress::BatchProgress;
use crate::domain::{FetchRequest, Interval, PageLimit};
use crate::exchange::{ExchangeClient, ExchangeError};
use crate::store::{CsvStore, StoreError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Everything the driver needs to enumerate combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    /// Keep symbols quoted in this asset (`BTC/USDT` for `USDT`). Empty keeps all.
    pub quote_asset: String,
    /// Explicit symbols; `None` means everything the exchange lists.
    pub symbols: Option<Vec<String>>,
    pub intervals: Vec<Interval>,
    pub days: Vec<NaiveDate>,
    /// Page-size overrides keyed by exchange id.
    pub page_limits: BTreeMap<String, u32>,
}

impl BatchPlan {
    pub fn page_limit_for(&self, exchange_id: &str) -> PageLimit {
        self.page_limits
            .get(exchange_id)
            .map_or(PageLimit::Unbounded, |rows| PageLimit::from_rows(*rows))
    }

    pub fn matches_quote(&self, symbol: &str) -> bool {
        self.quote_asset.is_empty()
            || symbol
                .rsplit_once('/')
                .is_some_and(|(_, quote)| quote == self.quote_asset)
    }

    /// Symbols to fetch given what the exchange listed.
    pub fn select_symbols(&self, listed: Vec<String>) -> Vec<String> {
        self.symbols
            .clone()
            .unwrap_or(listed)
            .into_iter()
            .filter(|s| self.matches_quote(s))
            .collect()
    }
}

/// One exchange / symbol / interval / day tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub exchange: String,
    pub symbol: String,
    pub interval: Interval,
    pub day: NaiveDate,
}

impl Combination {
    /// `okex_BTC/USDT_5m_2020-08-20`
    pub fn tag(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.exchange, self.symbol, self.interval, self.day
        )
    }
}

/// Successful outcome of one combination.
#[derive(Debug, Clone, PartialEq)]
pub enum ComboOutcome {
    Saved { path: PathBuf, bars: usize },
    /// The exchange had no bars for the day; nothing was written.
    Empty,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A combination (or a whole exchange, when symbol listing failed) that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub exchange: String,
    pub symbol: Option<String>,
    pub interval: Option<Interval>,
    pub day: Option<NaiveDate>,
    pub error: String,
}

impl FailureRecord {
    fn for_exchange(exchange: &str, error: &dyn fmt::Display) -> Self {
        Self {
            exchange: exchange.to_string(),
            symbol: None,
            interval: None,
            day: None,
            error: error.to_string(),
        }
    }

    fn for_combination(combo: &Combination, error: &dyn fmt::Display) -> Self {
        Self {
            exchange: combo.exchange.clone(),
            symbol: Some(combo.symbol.clone()),
            interval: Some(combo.interval),
            day: Some(combo.day),
            error: error.to_string(),
        }
    }

    /// Underscore-joined identifying parts, e.g. `binance_ETH/USDT_15m_2020-08-21`.
    pub fn tag(&self) -> String {
        let mut parts = vec![self.exchange.clone()];
        parts.extend(self.symbol.clone());
        parts.extend(self.interval.map(|i| i.to_string()));
        parts.extend(self.day.map(|d| d.to_string()));
        parts.join("_")
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag(), self.error)
    }
}

/// Summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub saved: usize,
    pub empty: usize,
    pub failures: Vec<FailureRecord>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_tags(&self) -> Vec<String> {
        self.failures.iter().map(FailureRecord::tag).collect()
    }
}

/// Fetch one day and persist it. Empty days write nothing.
pub fn fetch_and_store(
    fetcher: &DayFetcher,
    client: &dyn ExchangeClient,
    store: &CsvStore,
    request: &FetchRequest,
) -> Result<ComboOutcome, BatchError> {
    let bars = fetcher.fetch_day(client, request)?;
    let written = store.write(
        client.id(),
        request.day,
        &request.symbol,
        request.interval,
        &bars,
    )?;
    Ok(match written {
        Some(path) => ComboOutcome::Saved {
            path,
            bars: bars.len(),
        },
        None => ComboOutcome::Empty,
    })
}

pub struct BatchDriver {
    fetcher: DayFetcher,
    plan: BatchPlan,
}

impl BatchDriver {
    pub fn new(fetcher: DayFetcher, plan: BatchPlan) -> Self {
        Self { fetcher, plan }
    }

    /// Run every combination for every client, in order. Never aborts early.
    pub fn run(
        &self,
        clients: &[Box<dyn ExchangeClient>],
        store: &CsvStore,
        progress: &dyn BatchProgress,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for client in clients {
            self.run_exchange(client.as_ref(), store, progress, &mut report);
        }

        progress.on_batch_complete(&report);
        report
    }

    fn run_exchange(
        &self,
        client: &dyn ExchangeClient,
        store: &CsvStore,
        progress: &dyn BatchProgress,
        report: &mut BatchReport,
    ) {
        let exchange = client.id().to_string();

        let listed = if self.plan.symbols.is_some() {
            Vec::new()
        } else {
            self.fetcher.pacer().wait();
            match client.list_symbols() {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(exchange = %exchange, error = %e, "symbol listing failed, skipping exchange");
                    report.failures.push(FailureRecord::for_exchange(&exchange, &e));
                    return;
                }
            }
        };

        let symbols = self.plan.select_symbols(listed);
        let combinations = self.combinations(&exchange, &symbols);
        let total = combinations.len();
        progress.on_exchange(&exchange, symbols.len(), total);

        let page_limit = self.plan.page_limit_for(&exchange);

        for (index, combo) in combinations.iter().enumerate() {
            progress.on_start(combo, index, total);
            report.attempted += 1;

            let result = if client.is_available() {
                let request = FetchRequest::new(&combo.symbol, combo.interval, combo.day, page_limit);
                fetch_and_store(&self.fetcher, client, store, &request)
            } else {
                Err(ExchangeError::CircuitBreakerTripped.into())
            };
            progress.on_complete(combo, &result);

            match result {
                Ok(ComboOutcome::Saved { .. }) => report.saved += 1,
                Ok(ComboOutcome::Empty) => report.empty += 1,
                Err(e) => report
                    .failures
                    .push(FailureRecord::for_combination(combo, &e)),
            }
        }
    }

    /// Symbol-major order: symbol → interval → day.
    fn combinations(&self, exchange: &str, symbols: &[String]) -> Vec<Combination> {
        let mut out =
            Vec::with_capacity(symbols.len() * self.plan.intervals.len() * self.plan.days.len());
        for symbol in symbols {
            for &interval in &self.plan.intervals {
                for &day in &self.plan.days {
                    out.push(Combination {
                        exchange: exchange.to_string(),
                        symbol: symbol.clone(),
                        interval,
                        day,
                    });
                }
            }
        }
        out
    }
}
