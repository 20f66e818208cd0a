use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Breadth-based market mood, from the share of advancing pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentLabel {
    /// >= 80% advancing
    ExtremeBullish,
    /// >= 60%
    Bullish,
    /// >= 40%
    Neutral,
    /// >= 20%
    Bearish,
    /// < 20%
    ExtremeBearish,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ExtremeBullish => "extreme-bullish",
            Self::Bullish => "bullish",
            Self::Neutral => "neutral",
            Self::Bearish => "bearish",
            Self::ExtremeBearish => "extreme-bearish",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// `100 * advancing / total`, exact decimal.
    #[serde(with = "rust_decimal::serde::str")]
    pub up_ratio_percent: Decimal,
    pub advancing: usize,
    pub total: usize,
}

impl fmt::Display for SentimentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ratio = self.up_ratio_percent.round_dp(2);
        ratio.rescale(2);
        write!(f, "market sentiment: {} (advancing pairs {ratio}%)", self.label)
    }
}

/// Sentiment as delivered to report consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SentimentStatus {
    Available(SentimentResult),
    Unavailable { reason: String },
}

impl fmt::Display for SentimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(result) => result.fmt(f),
            Self::Unavailable { reason } => write!(f, "market sentiment unavailable: {reason}"),
        }
    }
}
