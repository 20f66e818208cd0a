//! Multi-timeframe report assembly and the consumer-facing bundle.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::errors::AnalysisError;
use crate::types::sentiment::SentimentStatus;
use crate::types::timeframe::Timeframe;
use crate::types::trend::TrendSnapshot;

/// A timeframe left out of the report and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmittedTimeframe {
    pub timeframe: Timeframe,
    pub reason: String,
}

/// Timeframe → snapshot mapping in configured order.
///
/// Timeframes whose fetch or classification failed are absent from the
/// entries and listed in `omitted` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTimeframeReport {
    primary: Timeframe,
    entries: Vec<(Timeframe, TrendSnapshot)>,
    omitted: Vec<OmittedTimeframe>,
}

impl MultiTimeframeReport {
    /// Assemble from per-timeframe outcomes already in configured order.
    pub fn from_outcomes(
        primary: Timeframe,
        outcomes: Vec<(Timeframe, Result<TrendSnapshot, AnalysisError>)>,
    ) -> Self {
        let mut entries = Vec::with_capacity(outcomes.len());
        let mut omitted = Vec::new();

        for (timeframe, outcome) in outcomes {
            match outcome {
                Ok(snapshot) => entries.push((timeframe, snapshot)),
                Err(e) => omitted.push(OmittedTimeframe {
                    timeframe,
                    reason: e.to_string(),
                }),
            }
        }

        Self {
            primary,
            entries,
            omitted,
        }
    }

    pub fn entries(&self) -> &[(Timeframe, TrendSnapshot)] {
        &self.entries
    }

    pub fn omitted(&self) -> &[OmittedTimeframe] {
        &self.omitted
    }

    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.entries.iter().map(|(tf, _)| *tf).collect()
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TrendSnapshot> {
        self.entries
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, snap)| snap)
    }

    /// Lookup by display label (e.g. `"4 hours"`).
    pub fn get_by_label(&self, label: &str) -> Option<&TrendSnapshot> {
        self.entries
            .iter()
            .find(|(tf, _)| tf.display_name() == label)
            .map(|(_, snap)| snap)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary_timeframe(&self) -> Timeframe {
        self.primary
    }

    /// Current price from the primary timeframe.
    ///
    /// Fails when the primary timeframe was omitted; callers must not fall
    /// back to another timeframe's price silently.
    pub fn primary_price(&self) -> Result<Decimal, AnalysisError> {
        self.get(self.primary)
            .map(|snap| snap.current_price)
            .ok_or(AnalysisError::PrimaryTimeframeMissing {
                timeframe: self.primary,
            })
    }
}

impl Serialize for MultiTimeframeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (tf, snap) in &self.entries {
            map.serialize_entry(tf.display_name(), snap)?;
        }
        map.end()
    }
}

/// Everything a report consumer (UI, narration) receives for one run.
///
/// Serializes with an `omitted_timeframes` list drawn from `timeframes`.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub timeframes: MultiTimeframeReport,
    pub sentiment: SentimentStatus,
}

impl AnalysisReport {
    pub fn new(symbol: &str, timeframes: MultiTimeframeReport, sentiment: SentimentStatus) -> Self {
        Self {
            symbol: symbol.to_string(),
            generated_at: Utc::now(),
            timeframes,
            sentiment,
        }
    }
}

impl Serialize for AnalysisReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnalysisReport", 5)?;
        state.serialize_field("symbol", &self.symbol)?;
        state.serialize_field("generated_at", &self.generated_at)?;
        state.serialize_field("timeframes", &self.timeframes)?;
        state.serialize_field("omitted_timeframes", self.timeframes.omitted())?;
        state.serialize_field("sentiment", &self.sentiment)?;
        state.end()
    }
}

/// Plain-text rendering: primary price, one row per analysed timeframe,
/// omitted timeframes, then sentiment.
impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primary = self.timeframes.primary_timeframe();
        match self.timeframes.primary_price() {
            Ok(price) => writeln!(
                f,
                "{} price: {} ({} close)",
                self.symbol,
                format_price(price),
                primary.display_name()
            )?,
            Err(e) => writeln!(f, "{} price unavailable: {e}", self.symbol)?,
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:<11} {:<5} {:<8} {:>10} {:>7} {:<10} {:<9} {:>16} {:>16} {:>16}",
            "timeframe", "ma20", "macd", "strength", "rsi", "rsi zone", "rsi/price", "support",
            "middle", "resistance"
        )?;
        for (timeframe, snap) in self.timeframes.entries() {
            let sr = &snap.support_resistance;
            writeln!(
                f,
                "{:<11} {:<5} {:<8} {:>10.4} {:>7.2} {:<10} {:<9} {:>16} {:>16} {:>16}",
                timeframe.display_name(),
                snap.ma20_trend.to_string(),
                snap.macd_analysis.direction.to_string(),
                snap.macd_analysis.strength,
                snap.rsi_analysis.value,
                snap.rsi_analysis.status.to_string(),
                snap.rsi_analysis.divergence.to_string(),
                format_level(sr.strong_support),
                format_level(sr.middle_line),
                format_level(sr.strong_resistance),
            )?;
        }
        for omitted in self.timeframes.omitted() {
            writeln!(f, "{:<11} omitted: {}", omitted.timeframe.display_name(), omitted.reason)?;
        }

        writeln!(f)?;
        write!(f, "{}", self.sentiment)
    }
}

fn format_level(level: f64) -> String {
    Decimal::from_f64(level).map_or_else(|| format!("{level:.2}"), format_price)
}

/// Price for display: 8 decimals below 0.1, otherwise 2 decimals with
/// thousands separators.
pub fn format_price(price: Decimal) -> String {
    let dp = if price.abs() < Decimal::new(1, 1) { 8 } else { 2 };
    let mut rounded = price.round_dp(dp);
    rounded.rescale(dp);

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{frac_part}")
    }
}
