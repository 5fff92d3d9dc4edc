//! Bar: one OHLCV record as reported by an exchange.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one calendar day.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// OHLCV bar for a single symbol and interval.
///
/// `timestamp` is the exchange-reported open time of the interval in
/// milliseconds since the Unix epoch (UTC). Volume is in base-asset units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open time as a UTC datetime. `None` if the timestamp is out of chrono's range.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// UTC calendar day the bar opens on.
    pub fn day(&self) -> Option<NaiveDate> {
        self.open_time().map(|dt| dt.date_naive())
    }
}

/// Start of `day` (00:00:00 UTC) in epoch milliseconds.
pub fn day_start_ms(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_from_timestamp() {
        // 2020-08-20 23:55:00 UTC
        let bar = Bar::new(1_597_967_700_000, 1.0, 1.0, 1.0, 1.0, 0.0);
        assert_eq!(bar.day(), NaiveDate::from_ymd_opt(2020, 8, 20));
    }

    #[test]
    fn midnight_belongs_to_the_new_day() {
        let day = NaiveDate::from_ymd_opt(2020, 8, 21).unwrap();
        let bar = Bar::new(day_start_ms(day), 1.0, 1.0, 1.0, 1.0, 0.0);
        assert_eq!(bar.day(), Some(day));
    }

    #[test]
    fn day_start_is_utc_midnight() {
        let day = NaiveDate::from_ymd_opt(2020, 8, 20).unwrap();
        assert_eq!(day_start_ms(day), 1_597_881_600_000);
        assert_eq!(
            day_start_ms(day.succ_opt().unwrap()) - day_start_ms(day),
            DAY_MS
        );
    }

    #[test]
    fn out_of_range_timestamp_has_no_day() {
        let bar = Bar::new(i64::MAX, 1.0, 1.0, 1.0, 1.0, 0.0);
        assert!(bar.day().is_none());
    }
}
