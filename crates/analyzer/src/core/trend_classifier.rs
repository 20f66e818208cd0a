//! Reduces the last row of an indicator frame (plus a short lookback) into a
//! [`TrendSnapshot`].
//!
//! Tie-breaks are uniform: a strict comparison decides the "positive" side,
//! equality falls to the other. A zero MA slope is `Down`, `macd == signal` is
//! `Bearish`, an RSI of exactly 70 or 30 is `Neutral`, and an unchanged price
//! or RSI over the lookback counts as moving down.

use tracing::trace;

use crate::config::IndicatorParams;
use crate::errors::AnalysisError;
use crate::types::{
    CandleSeries, Divergence, IndicatorFrame, MacdAnalysis, MacdDirection, RsiAnalysis,
    RsiStatus, SupportResistance, TrendDirection, TrendSnapshot,
};

/// Classify the most recent candle of `series` using its computed `frame`.
///
/// # Errors
///
/// - [`AnalysisError::InvalidInput`] if the frame is not aligned with the series
///   or `divergence_lookback` is zero.
/// - [`AnalysisError::InsufficientData`] if any derived field is undefined at
///   the last row.
/// - [`AnalysisError::InsufficientHistory`] if the series is shorter than
///   [`IndicatorParams::min_history`] or the lookback RSI is undefined.
pub fn classify(
    series: &CandleSeries,
    frame: &IndicatorFrame,
    params: &IndicatorParams,
) -> Result<TrendSnapshot, AnalysisError> {
    if frame.len() != series.len() {
        return Err(AnalysisError::InvalidInput {
            reason: format!(
                "indicator frame has {} rows but series has {} candles",
                frame.len(),
                series.len()
            ),
        });
    }
    if params.divergence_lookback == 0 {
        return Err(AnalysisError::InvalidInput {
            reason: "divergence_lookback must be at least 1".into(),
        });
    }

    let n = frame.len();
    let last_index = n.saturating_sub(1);
    let last = frame
        .row(last_index)
        .map_err(|field| AnalysisError::InsufficientData {
            field,
            index: last_index,
        })?;

    let required = params.min_history();
    if n < required {
        return Err(AnalysisError::InsufficientHistory {
            required,
            available: n,
        });
    }

    // `close[-1]` vs `close[-lookback]`.
    let back_index = n
        .checked_sub(params.divergence_lookback)
        .ok_or(AnalysisError::InsufficientHistory {
            required: params.divergence_lookback,
            available: n,
        })?;
    let back_close = frame.close[back_index];
    let back_rsi = frame.rsi[back_index].ok_or(AnalysisError::InsufficientHistory {
        required: back_index + params.rsi_period + 1,
        available: n,
    })?;

    let price_move = TrendDirection::from_change(back_close, last.close);
    let rsi_move = TrendDirection::from_change(back_rsi, last.rsi);
    let divergence = if price_move == rsi_move {
        Divergence::Aligned
    } else {
        Divergence::Diverging
    };

    let macd_direction = if last.macd > last.signal {
        MacdDirection::Bullish
    } else {
        MacdDirection::Bearish
    };

    let candle = series.last();
    let snapshot = TrendSnapshot {
        as_of: candle.timestamp,
        current_price: candle.close,
        ma20_trend: TrendDirection::from_sign(last.ma20_trend),
        support_resistance: SupportResistance {
            strong_resistance: last.boll_up,
            middle_line: last.boll_mid,
            strong_support: last.boll_down,
        },
        macd_analysis: MacdAnalysis {
            direction: macd_direction,
            strength: last.macd_hist.abs(),
            macd: last.macd,
            signal: last.signal,
            histogram: last.macd_hist,
        },
        rsi_analysis: RsiAnalysis {
            value: last.rsi,
            status: rsi_status(last.rsi, params),
            divergence,
        },
    };

    trace!(
        as_of = snapshot.as_of,
        ma20_trend = %snapshot.ma20_trend,
        macd = %snapshot.macd_analysis.direction,
        rsi = snapshot.rsi_analysis.value,
        divergence = %divergence,
        "trend classified"
    );

    Ok(snapshot)
}

/// Exclusive thresholds: values on the boundary are neutral.
fn rsi_status(rsi: f64, params: &IndicatorParams) -> RsiStatus {
    if rsi > params.rsi_overbought {
        RsiStatus::Overbought
    } else if rsi < params.rsi_oversold {
        RsiStatus::Oversold
    } else {
        RsiStatus::Neutral
    }
}
