//! Pure computation module for the per-candle indicator columns.
//!
//! No I/O, no side effects. Every function takes an aligned price array and
//! returns a column of the same length; rows whose trailing window is not yet
//! populated are `None`. Prices arrive as `Decimal` in the candle series and
//! are converted to `f64` once, at the frame boundary.
//!
//! Indicators implemented:
//! - Trend: SMA(20), smoothed first difference of the SMA (slope sign)
//! - Volatility: Bollinger bands on the sample standard deviation
//! - Momentum: MACD(12, 26, 9) on recursive EMAs seeded at the first value,
//!   RSI(14) on simple rolling means of gains and losses
//!
//! RSI convention: when the trailing average loss is exactly zero the RSI is
//! reported as [`RSI_SATURATION`] (100), including the flat case where the
//! average gain is zero as well.

use crate::config::IndicatorParams;
use crate::constants::RSI_SATURATION;
use crate::types::{CandleSeries, IndicatorFrame};

// ═══════════════════════════════════════════════════════════════════════════
// Rolling windows
// ═══════════════════════════════════════════════════════════════════════════

/// Apply `f` to every full trailing window of `values`.
fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for end in window..=values.len() {
        out[end - 1] = Some(f(&values[end - window..end]));
    }
    out
}

/// Like [`rolling`], but over a column with warm-up gaps: a window containing
/// any undefined value yields `None`.
fn rolling_defined<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    let mut buf = Vec::with_capacity(window);
    for end in window..=values.len() {
        buf.clear();
        buf.extend(values[end - window..end].iter().map_while(|v| *v));
        if buf.len() == window {
            out[end - 1] = Some(f(&buf));
        }
    }
    out
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

/// Sample (n − 1) standard deviation, two-pass.
fn sample_std(window: &[f64]) -> f64 {
    let m = mean(window);
    let ss: f64 = window.iter().map(|&x| (x - m) * (x - m)).sum();
    (ss / (window.len() - 1) as f64).sqrt()
}

// ═══════════════════════════════════════════════════════════════════════════
// Standard Technical Indicators
// ═══════════════════════════════════════════════════════════════════════════

/// Simple moving average over a trailing window (inclusive of the current row).
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Sample standard deviation over a trailing window. Windows shorter than two
/// points are undefined.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }
    rolling(values, window, sample_std)
}

/// First difference; row 0 and rows next to a gap are undefined.
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in 1..values.len() {
        if let (Some(prev), Some(cur)) = (values[i - 1], values[i]) {
            out[i] = Some(cur - prev);
        }
    }
    out
}

/// Trailing mean over a column with warm-up gaps.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_defined(values, window, mean)
}

/// Exponential moving average without bias correction.
///
/// `α = 2 / (span + 1)`, `EMA_0 = x_0`, `EMA_t = α·x_t + (1 − α)·EMA_{t−1}`.
/// Defined from the first row.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = first;
    out.push(first);
    for &x in &values[1..] {
        // Same recurrence; a repeated value leaves the average bit-exact.
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

/// Moving Average Convergence Divergence.
///
/// Returns `(macd_line, signal_line, histogram)` columns, all aligned with
/// `prices`. `histogram[i] == macd_line[i] - signal_line[i]` exactly.
pub fn macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    (macd_line, signal_line, histogram)
}

/// Relative Strength Index on simple rolling means (not Wilder's smoothing).
///
/// Row `i` averages the `period` close-to-close deltas ending at `i`, so the
/// first defined row is `period`. A zero average loss yields
/// [`RSI_SATURATION`].
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    // deltas[j] is the change into row j + 1.
    for end in period..=deltas.len() {
        let window = &deltas[end - period..end];
        let avg_gain = window.iter().map(|&d| d.max(0.0)).sum::<f64>() / period_f;
        let avg_loss = window.iter().map(|&d| (-d).max(0.0)).sum::<f64>() / period_f;

        out[end] = Some(if avg_loss == 0.0 {
            RSI_SATURATION
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        });
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Composite
// ═══════════════════════════════════════════════════════════════════════════

/// Compute every indicator column for `series`.
///
/// Deterministic: the same series and parameters always yield a bit-identical
/// frame.
pub fn compute_frame(series: &CandleSeries, params: &IndicatorParams) -> IndicatorFrame {
    let closes = series.closes_f64();

    let ma = sma(&closes, params.ma_period);
    let std = rolling_std(&closes, params.ma_period);

    let band = |sign: f64| -> Vec<Option<f64>> {
        ma.iter()
            .zip(&std)
            .map(|(m, s)| match (m, s) {
                (Some(m), Some(s)) => Some(m + sign * params.band_std_mult * s),
                _ => None,
            })
            .collect()
    };
    let boll_up = band(1.0);
    let boll_down = band(-1.0);

    let ma_trend = rolling_mean(&diff(&ma), params.trend_smoothing);

    let (macd_line, signal_line, histogram) = macd(
        &closes,
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    );

    let rsi_col = rsi(&closes, params.rsi_period);

    let defined = |col: Vec<f64>| -> Vec<Option<f64>> { col.into_iter().map(Some).collect() };

    IndicatorFrame {
        ma20: ma.clone(),
        boll_mid: ma,
        boll_std: std,
        boll_up,
        boll_down,
        ma20_trend: ma_trend,
        macd: defined(macd_line),
        signal: defined(signal_line),
        macd_hist: defined(histogram),
        rsi: rsi_col,
        close: closes,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candle;
    use proptest::prelude::*;
    use rust_decimal::prelude::*;
    use rust_decimal::Decimal;

    const HOUR_MS: i64 = 3_600_000;

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let close = Decimal::from_f64(c).unwrap();
                Candle {
                    timestamp: i as i64 * HOUR_MS,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Decimal::ONE,
                }
            })
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    /// 100 ascending closes (100..=199) followed by 100 flat closes at 199.
    fn ascending_then_flat() -> Vec<f64> {
        (0..200).map(|i| if i < 100 { 100.0 + i as f64 } else { 199.0 }).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -- SMA / STD ---------------------------------------------------------

    #[test]
    fn test_sma_warm_up_is_undefined() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_window_longer_than_series() {
        assert!(sma(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = rolling_std(&values, 8);
        // Σ(x − 5)² = 32, n − 1 = 7.
        assert!(approx(out[7].unwrap(), (32.0_f64 / 7.0).sqrt()));
        assert!(out[6].is_none());
    }

    #[test]
    fn test_rolling_std_flat_is_zero() {
        let out = rolling_std(&[3.0; 20], 20);
        assert_eq!(out[19], Some(0.0));
    }

    #[test]
    fn test_diff_and_rolling_mean_propagate_gaps() {
        let d = diff(&[None, Some(1.0), Some(3.0), Some(6.0)]);
        assert_eq!(d, vec![None, None, Some(2.0), Some(3.0)]);
        let m = rolling_mean(&d, 2);
        assert_eq!(m, vec![None, None, None, Some(2.5)]);
    }

    // -- EMA / MACD --------------------------------------------------------

    #[test]
    fn test_ema_seeded_at_first_value() {
        // span 3 → α = 0.5
        assert_eq!(ema(&[1.0, 2.0, 3.0], 3), vec![1.0, 1.5, 2.25]);
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 12).is_empty());
    }

    #[test]
    fn test_macd_flat_prices() {
        let (m, s, h) = macd(&[100.0; 50], 12, 26, 9);
        assert!(m.iter().chain(&s).chain(&h).all(|&v| v == 0.0));
    }

    #[test]
    fn test_macd_rising_prices_positive() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (m, s, _) = macd(&prices, 12, 26, 9);
        assert!(m[59] > 0.0);
        assert!(m[59] > s[59]);
    }

    // -- RSI ---------------------------------------------------------------

    #[test]
    fn test_rsi_hand_computed() {
        // deltas: +1, −1, +2
        let out = rsi(&[1.0, 2.0, 1.0, 3.0], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(approx(out[2].unwrap(), 50.0));
        // gains (0, 2) → 1, losses (1, 0) → 0.5, rs = 2
        assert!(approx(out[3].unwrap(), 100.0 - 100.0 / 3.0));
    }

    #[test]
    fn test_rsi_all_gains_saturates() {
        let prices: Vec<f64> = (1..=15).map(f64::from).collect();
        let out = rsi(&prices, 14);
        assert_eq!(out[13], None);
        assert_eq!(out[14], Some(RSI_SATURATION));
    }

    #[test]
    fn test_rsi_non_negative_deltas_saturate() {
        // Zero deltas mixed in: still no losses.
        let prices = [
            10.0, 10.0, 11.0, 11.0, 12.0, 12.0, 12.0, 13.0, 14.0, 14.0, 15.0, 15.0, 16.0,
            16.0, 17.0,
        ];
        assert_eq!(rsi(&prices, 14)[14], Some(RSI_SATURATION));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let prices: Vec<f64> = (0..20).rev().map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&prices, 14)[19], Some(0.0));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(rsi(&[10.0, 11.0], 14).iter().all(Option::is_none));
    }

    // -- Frame -------------------------------------------------------------

    #[test]
    fn test_frame_columns_aligned_with_series() {
        let series = series_from_closes(&ascending_then_flat());
        let frame = compute_frame(&series, &IndicatorParams::default());
        assert_eq!(frame.len(), 200);
        for (name, col) in frame.derived_columns() {
            assert_eq!(col.len(), 200, "column {name} misaligned");
        }
    }

    #[test]
    fn test_frame_warm_up_boundaries() {
        let series = series_from_closes(&ascending_then_flat());
        let frame = compute_frame(&series, &IndicatorParams::default());

        assert!(frame.ma20[18].is_none());
        assert!(frame.ma20[19].is_some());
        assert!(frame.boll_up[18].is_none());
        assert!(frame.boll_up[19].is_some());
        // diff needs ma20[19] and ma20[20]; five of them end at row 24.
        assert!(frame.ma20_trend[23].is_none());
        assert!(frame.ma20_trend[24].is_some());
        assert!(frame.rsi[13].is_none());
        assert!(frame.rsi[14].is_some());
        assert!(frame.macd[0].is_some());
    }

    #[test]
    fn test_ma20_trend_ascending_then_flat_fixture() {
        let series = series_from_closes(&ascending_then_flat());
        let frame = compute_frame(&series, &IndicatorParams::default());

        // Row 50: window fully ascending, ma20 = 90.5 + 50, slope 1.
        assert!(approx(frame.ma20[50].unwrap(), 140.5));
        assert!(approx(frame.ma20_trend[50].unwrap(), 1.0));

        // Row 110: diffs at rows 106..=110 are (119 − t) / 20 → 0.65 … 0.45.
        assert!(approx(frame.ma20[110].unwrap(), 197.2));
        assert!(approx(frame.ma20_trend[110].unwrap(), 0.55));

        // Row 130: window fully flat.
        assert_eq!(frame.ma20[130], Some(199.0));
        assert_eq!(frame.ma20_trend[130], Some(0.0));
        assert_eq!(frame.boll_std[130], Some(0.0));
        assert_eq!(frame.boll_up[130], Some(199.0));
    }

    #[test]
    fn test_bollinger_bands_bracket_mid() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let frame = compute_frame(&series_from_closes(&closes), &IndicatorParams::default());
        let i = 39;
        let (mid, sd) = (frame.boll_mid[i].unwrap(), frame.boll_std[i].unwrap());
        assert!(approx(frame.boll_up[i].unwrap(), mid + 2.0 * sd));
        assert!(approx(frame.boll_down[i].unwrap(), mid - 2.0 * sd));
        assert_eq!(frame.boll_mid, frame.ma20);
    }

    // -- Properties ----------------------------------------------------------

    fn closes_strategy(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(1u32..100_000u32, min_len..min_len + 60)
            .prop_map(|v| v.into_iter().map(|c| f64::from(c) / 100.0).collect())
    }

    proptest! {
        #[test]
        fn last_row_defined_for_200_candles(closes in closes_strategy(200)) {
            let frame = compute_frame(&series_from_closes(&closes), &IndicatorParams::default());
            prop_assert!(frame.row(frame.len() - 1).is_ok());
        }

        #[test]
        fn macd_histogram_identity(closes in closes_strategy(30)) {
            let frame = compute_frame(&series_from_closes(&closes), &IndicatorParams::default());
            for i in 0..frame.len() {
                if let (Some(m), Some(s), Some(h)) =
                    (frame.macd[i], frame.signal[i], frame.macd_hist[i])
                {
                    prop_assert_eq!(h.to_bits(), (m - s).to_bits());
                }
            }
        }

        #[test]
        fn frame_is_bit_identical_on_repeat(closes in closes_strategy(30)) {
            let series = series_from_closes(&closes);
            let params = IndicatorParams::default();
            let a = compute_frame(&series, &params);
            let b = compute_frame(&series, &params);
            for ((name, ca), (_, cb)) in a.derived_columns().into_iter().zip(b.derived_columns()) {
                let bits_a: Vec<_> = ca.iter().map(|v| v.map(f64::to_bits)).collect();
                let bits_b: Vec<_> = cb.iter().map(|v| v.map(f64::to_bits)).collect();
                prop_assert_eq!(bits_a, bits_b, "column {} differs", name);
            }
        }

        #[test]
        fn rsi_stays_in_bounds(closes in closes_strategy(30)) {
            for v in rsi(&closes, 14).into_iter().flatten() {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }
}
