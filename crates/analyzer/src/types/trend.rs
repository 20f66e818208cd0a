use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the smoothed MA20 slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    /// `Up` only for a strictly positive value; zero is `Down`.
    #[must_use]
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    /// `Up` only when `current` is strictly above `previous`.
    #[must_use]
    pub fn from_change(previous: f64, current: f64) -> Self {
        if current > previous {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// MACD line relative to its signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdDirection {
    Bullish,
    Bearish,
}

/// RSI zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiStatus {
    /// RSI > overbought threshold (70).
    Overbought,
    /// RSI < oversold threshold (30).
    Oversold,
    Neutral,
}

/// Price direction vs RSI direction over the divergence lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    Diverging,
    Aligned,
}

/// Bollinger levels read as dynamic support/resistance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Upper band.
    pub strong_resistance: f64,
    /// Middle band (MA20).
    pub middle_line: f64,
    /// Lower band.
    pub strong_support: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdAnalysis {
    pub direction: MacdDirection,
    /// `|macd_hist|`.
    pub strength: f64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiAnalysis {
    pub value: f64,
    pub status: RsiStatus,
    pub divergence: Divergence,
}

/// Summary of the last row (plus a short lookback) of an indicator frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    /// Open time (ms) of the candle the snapshot describes.
    pub as_of: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub current_price: Decimal,
    pub ma20_trend: TrendDirection,
    pub support_resistance: SupportResistance,
    pub macd_analysis: MacdAnalysis,
    pub rsi_analysis: RsiAnalysis,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

impl fmt::Display for MacdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

impl fmt::Display for RsiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overbought => write!(f, "overbought"),
            Self::Oversold => write!(f, "oversold"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diverging => write!(f, "diverging"),
            Self::Aligned => write!(f, "aligned"),
        }
    }
}
