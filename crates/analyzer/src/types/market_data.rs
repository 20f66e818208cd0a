use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

/// A single OHLCV candle.
///
/// `timestamp` is the candle open time in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

impl Candle {
    /// `high >= max(open, close) >= min(open, close) >= low`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close) && self.open.min(self.close) >= self.low
    }
}

/// Validated, time-ordered candle sequence.
///
/// Construction rejects empty input, non-increasing timestamps, non-positive
/// prices and negative volume. OHLC ordering violations are tolerated (the
/// exchange does not guarantee them) and only counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    malformed_count: usize,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, AnalysisError> {
        if candles.is_empty() {
            return Err(AnalysisError::InvalidInput {
                reason: "empty candle series".into(),
            });
        }

        for (i, c) in candles.iter().enumerate() {
            if c.open <= Decimal::ZERO
                || c.high <= Decimal::ZERO
                || c.low <= Decimal::ZERO
                || c.close <= Decimal::ZERO
            {
                return Err(AnalysisError::InvalidInput {
                    reason: format!("non-positive price at row {i} (ts {})", c.timestamp),
                });
            }
            if c.volume < Decimal::ZERO {
                return Err(AnalysisError::InvalidInput {
                    reason: format!("negative volume at row {i} (ts {})", c.timestamp),
                });
            }
        }

        if let Some(i) = candles
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(AnalysisError::InvalidInput {
                reason: format!(
                    "timestamps not strictly increasing at row {}: {} -> {}",
                    i + 1,
                    candles[i].timestamp,
                    candles[i + 1].timestamp
                ),
            });
        }

        let malformed_count = candles.iter().filter(|c| !c.is_well_formed()).count();

        Ok(Self {
            candles,
            malformed_count,
        })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Number of candles whose high/low do not bracket open and close.
    pub fn malformed_count(&self) -> usize {
        self.malformed_count
    }

    pub fn last(&self) -> &Candle {
        // Non-empty by construction.
        &self.candles[self.candles.len() - 1]
    }

    /// Close prices as `f64` for the indicator math.
    pub fn closes_f64(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

/// 24h price change for one trading pair (sentiment input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerChange {
    pub symbol: String,
    #[serde(rename = "priceChangePercent", with = "rust_decimal::serde::str")]
    pub price_change_percent: Decimal,
}
