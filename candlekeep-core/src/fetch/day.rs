//! Day fetcher: walks an exchange's paged OHLCV endpoint across one UTC day
//! and reconciles the pages into a deduplicated, sorted, day-bounded sequence.

use super::pacer::Pacer;
use crate::domain::{Bar, FetchRequest, DAY_MS};
use crate::exchange::{ExchangeClient, ExchangeError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Upper bound on pages for a single day before giving up.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

pub struct DayFetcher {
    pacer: Pacer,
    max_pages: usize,
}

impl DayFetcher {
    pub fn new(pacer: Pacer) -> Self {
        Self {
            pacer,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Fetch every bar of `request.day` from `client`.
    ///
    /// The cursor starts at the day's midnight and moves to the last bar of
    /// each page; the page that follows re-sends that bar and reconciliation
    /// drops the duplicate. Pagination ends when a page reaches the next day,
    /// holds at most one row, or fails to move the cursor forward.
    ///
    /// An empty result means the exchange has no bars for that day. Exchange
    /// errors are returned as-is; nothing is retried here.
    pub fn fetch_day(
        &self,
        client: &dyn ExchangeClient,
        request: &FetchRequest,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let day_start = client.parse_timestamp(&format!("{}T00:00:00Z", request.day))?;
        let day_end = day_start + DAY_MS;
        let limit = request.page_limit.as_option();

        let mut cursor = day_start;
        let mut pages: Vec<Vec<Bar>> = Vec::new();

        loop {
            if pages.len() >= self.max_pages {
                return Err(ExchangeError::PaginationStalled {
                    symbol: request.symbol.clone(),
                    pages: pages.len(),
                });
            }

            self.pacer.wait();
            let page = client.fetch_ohlcv(&request.symbol, request.interval, cursor, limit)?;
            let rows = page.len();
            let last_ts = page.last().map(|b| b.timestamp);
            pages.push(page);

            debug!(
                exchange = client.id(),
                request = %request,
                page = pages.len(),
                cursor,
                rows,
                ?last_ts,
                "fetched page"
            );

            let Some(last_ts) = last_ts else { break };
            let advanced = last_ts > cursor;
            cursor = last_ts;

            if last_ts >= day_end || rows <= 1 || !advanced {
                break;
            }
        }

        let page_count = pages.len();
        let bars = reconcile(&pages, request.day);
        info!(
            exchange = client.id(),
            request = %request,
            pages = page_count,
            bars = bars.len(),
            "day fetched"
        );
        Ok(bars)
    }
}

/// Merge fetched pages into the final sequence for `day`.
///
/// Keeps bars whose UTC date is `day`, resolves duplicate timestamps in favour
/// of the last occurrence (later pages carry revised bars), and sorts
/// ascending by timestamp.
pub fn reconcile(pages: &[Vec<Bar>], day: NaiveDate) -> Vec<Bar> {
    let mut by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    for bar in pages.iter().flatten().filter(|b| b.day() == Some(day)) {
        by_ts.insert(bar.timestamp, *bar);
    }
    by_ts.into_values().collect()
}
