use super::Interval;
use chrono::NaiveDate;
use std::fmt;
use std::num::NonZeroU32;

/// Maximum rows to ask an exchange for in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLimit {
    /// Let the exchange apply its own default page size.
    #[default]
    Unbounded,
    /// Ask for at most this many rows.
    Rows(NonZeroU32),
}

impl PageLimit {
    /// `Unbounded` for zero, otherwise `Rows(n)`.
    pub fn from_rows(rows: u32) -> Self {
        NonZeroU32::new(rows).map_or(PageLimit::Unbounded, PageLimit::Rows)
    }

    /// The `limit` argument passed to [`ExchangeClient::fetch_ohlcv`](crate::exchange::ExchangeClient::fetch_ohlcv).
    pub fn as_option(&self) -> Option<u32> {
        match self {
            PageLimit::Unbounded => None,
            PageLimit::Rows(n) => Some(n.get()),
        }
    }
}

/// One unit of work for the day fetcher: a symbol, interval and UTC day on
/// whichever exchange client it is run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub day: NaiveDate,
    pub page_limit: PageLimit,
}

impl FetchRequest {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        day: NaiveDate,
        page_limit: PageLimit,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            day,
            page_limit,
        }
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.interval, self.day)
    }
}
