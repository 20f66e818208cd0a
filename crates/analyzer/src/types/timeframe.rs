//! Timeframe types for multi-timeframe analysis.
//!
//! The analyzer works on a fixed set of five granularities, from 5-minute
//! to daily candles, each with its Binance interval code and display label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported analysis timeframes.
///
/// Ordered from shortest to longest for iteration purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Timeframe {
    /// 5-minute candles
    #[serde(rename = "5m")]
    M5,
    /// 15-minute candles
    #[serde(rename = "15m")]
    M15,
    /// 1-hour candles
    #[serde(rename = "1h")]
    H1,
    /// 4-hour candles
    #[serde(rename = "4h")]
    H4,
    /// Daily candles (primary)
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// All timeframes in configured report order (shortest to longest).
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// Binance kline interval string representation.
    #[must_use]
    pub const fn as_binance_interval(&self) -> &'static str {
        match self {
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Parse from Binance interval string.
    #[must_use]
    pub fn from_binance_interval(s: &str) -> Option<Self> {
        match s {
            "5m" => Some(Self::M5),
            "15m" => Some(Self::M15),
            "1h" => Some(Self::H1),
            "4h" => Some(Self::H4),
            "1d" => Some(Self::D1),
            _ => None,
        }
    }

    /// Human-readable label used as the report key.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::M5 => "5 minutes",
            Self::M15 => "15 minutes",
            Self::H1 => "1 hour",
            Self::H4 => "4 hours",
            Self::D1 => "daily",
        }
    }

    /// Duration in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        match self {
            Self::M5 => 300,
            Self::M15 => 900,
            Self::H1 => 3600,
            Self::H4 => 14_400,
            Self::D1 => 86_400,
        }
    }

    /// Duration in milliseconds (Binance kline timestamps are in ms).
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.duration_secs() as i64 * 1000
    }

    /// Short-term horizon (5m-15m) in the narration breakdown.
    #[must_use]
    pub const fn is_short_term(&self) -> bool {
        matches!(self, Self::M5 | Self::M15)
    }

    /// Long-term horizon (daily) in the narration breakdown.
    #[must_use]
    pub const fn is_long_term(&self) -> bool {
        matches!(self, Self::D1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_binance_interval())
    }
}
