//! Candle interval (timeframe) in the unified `<count><unit>` notation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported candle intervals.
///
/// The canonical string (`"5m"`, `"1h"`, ...) is what users configure and what
/// appears in file names. Exchange adapters translate it to their own spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H12,
    D1,
    W1,
}

impl Interval {
    pub const ALL: [Interval; 12] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::H6,
        Interval::H12,
        Interval::D1,
        Interval::W1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }

    /// Length of one bar in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Interval::M1 => MINUTE,
            Interval::M3 => 3 * MINUTE,
            Interval::M5 => 5 * MINUTE,
            Interval::M15 => 15 * MINUTE,
            Interval::M30 => 30 * MINUTE,
            Interval::H1 => 60 * MINUTE,
            Interval::H2 => 120 * MINUTE,
            Interval::H4 => 240 * MINUTE,
            Interval::H6 => 360 * MINUTE,
            Interval::H12 => 720 * MINUTE,
            Interval::D1 => 1440 * MINUTE,
            Interval::W1 => 7 * 1440 * MINUTE,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an interval string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interval '{0}' (expected one of 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 12h, 1d, 1w)")]
pub struct ParseIntervalError(pub String);

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| ParseIntervalError(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = ParseIntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_strings() {
        assert_eq!("5m".parse::<Interval>().unwrap(), Interval::M5);
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::M15);
        assert_eq!(" 1h ".parse::<Interval>().unwrap(), Interval::H1);
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::D1);
    }

    #[test]
    fn rejects_unknown() {
        let err = "7m".parse::<Interval>().unwrap_err();
        assert!(err.to_string().contains("7m"));
        assert!("5M".parse::<Interval>().is_err());
    }

    #[test]
    fn display_matches_as_str() {
        for i in Interval::ALL {
            assert_eq!(i.to_string(), i.as_str());
            assert_eq!(i.as_str().parse::<Interval>().unwrap(), i);
        }
    }

    #[test]
    fn durations() {
        assert_eq!(Interval::M5.duration_ms(), 300_000);
        assert_eq!(Interval::D1.duration_ms(), 86_400_000);
        assert_eq!(Interval::M5.duration_ms() * 288, Interval::D1.duration_ms());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let json = serde_json::to_string(&Interval::M15).unwrap();
        assert_eq!(json, "\"15m\"");
        let back: Interval = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(back, Interval::H4);
        assert!(serde_json::from_str::<Interval>("\"9x\"").is_err());
    }
}
