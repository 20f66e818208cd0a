use anyhow::{bail, Result};
use std::collections::HashSet;

use super::types::{AnalyzerConfig, IndicatorParams};
use crate::constants::{MAX_CANDLE_LIMIT, MAX_REFRESH_SECONDS, MIN_REFRESH_SECONDS};

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Called automatically by [`super::load_config`].
pub fn validate_config(config: &AnalyzerConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_analysis_config(config, &mut errors);
    validate_indicator_params(&config.analysis.indicators, &mut errors);
    validate_market_data_config(config, &mut errors);
    validate_narration_config(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// Analysis config
// ---------------------------------------------------------------------------

fn validate_analysis_config(config: &AnalyzerConfig, errors: &mut Vec<String>) {
    let analysis = &config.analysis;

    if analysis.timeframes.is_empty() {
        errors.push("analysis.timeframes: must list at least one timeframe".into());
    }

    let mut seen = HashSet::new();
    for tf in &analysis.timeframes {
        if !seen.insert(*tf) {
            errors.push(format!("analysis.timeframes: duplicate timeframe {tf}"));
        }
    }

    if !analysis.timeframes.contains(&analysis.primary_timeframe) {
        errors.push(format!(
            "analysis.primary_timeframe: {} is not among the configured timeframes",
            analysis.primary_timeframe
        ));
    }

    let min_limit = analysis.indicators.min_history() as u32;
    if analysis.candle_limit < min_limit || analysis.candle_limit > MAX_CANDLE_LIMIT {
        errors.push(format!(
            "analysis.candle_limit: must be in [{min_limit}, {MAX_CANDLE_LIMIT}], got {}",
            analysis.candle_limit
        ));
    }

    if analysis.quote_asset.trim().is_empty() {
        errors.push("analysis.quote_asset: must not be empty".into());
    }

    let tf_count = analysis.timeframes.len().max(1);
    if analysis.max_concurrency == 0 || analysis.max_concurrency > tf_count {
        errors.push(format!(
            "analysis.max_concurrency: must be in [1, {tf_count}], got {}",
            analysis.max_concurrency
        ));
    }

    if let Some(secs) = analysis.refresh_interval_seconds {
        if !(MIN_REFRESH_SECONDS..=MAX_REFRESH_SECONDS).contains(&secs) {
            errors.push(format!(
                "analysis.refresh_interval_seconds: must be in [{MIN_REFRESH_SECONDS}, {MAX_REFRESH_SECONDS}], got {secs}"
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Indicator parameters
// ---------------------------------------------------------------------------

fn validate_indicator_params(params: &IndicatorParams, errors: &mut Vec<String>) {
    let periods = [
        ("ma_period", params.ma_period),
        ("trend_smoothing", params.trend_smoothing),
        ("macd_fast", params.macd_fast),
        ("macd_slow", params.macd_slow),
        ("macd_signal", params.macd_signal),
        ("rsi_period", params.rsi_period),
        ("divergence_lookback", params.divergence_lookback),
    ];
    for (name, value) in periods {
        if value == 0 {
            errors.push(format!("analysis.indicators.{name}: must be > 0"));
        }
    }

    // Sample standard deviation needs two points.
    if params.ma_period < 2 {
        errors.push("analysis.indicators.ma_period: must be >= 2".into());
    }

    if params.macd_fast >= params.macd_slow {
        errors.push(format!(
            "analysis.indicators: macd_fast ({}) must be < macd_slow ({})",
            params.macd_fast, params.macd_slow
        ));
    }

    if !(params.band_std_mult.is_finite() && params.band_std_mult > 0.0) {
        errors.push(format!(
            "analysis.indicators.band_std_mult: must be a positive number, got {}",
            params.band_std_mult
        ));
    }

    let thresholds_ok = params.rsi_oversold > 0.0
        && params.rsi_overbought < 100.0
        && params.rsi_oversold < params.rsi_overbought;
    if !thresholds_ok {
        errors.push(format!(
            "analysis.indicators: need 0 < rsi_oversold ({}) < rsi_overbought ({}) < 100",
            params.rsi_oversold, params.rsi_overbought
        ));
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

fn validate_market_data_config(config: &AnalyzerConfig, errors: &mut Vec<String>) {
    let md = &config.market_data;

    if !(md.base_url.starts_with("http://") || md.base_url.starts_with("https://")) {
        errors.push(format!(
            "market_data.base_url: must be an http(s) URL, got {:?}",
            md.base_url
        ));
    }

    if md.request_timeout_seconds == 0 {
        errors.push("market_data.request_timeout_seconds: must be > 0".into());
    }
}

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

fn validate_narration_config(config: &AnalyzerConfig, errors: &mut Vec<String>) {
    let Some(narration) = config.narration.as_ref() else {
        return;
    };
    if !narration.enabled {
        return;
    }

    if narration.api_key.is_empty() {
        errors.push("narration: enabled but no API key (set CLAUDE_API_KEY)".into());
    }

    if narration.model.is_empty() {
        errors.push("narration.model: must not be empty".into());
    }

    let tokens = &narration.max_tokens;
    if tokens.trading_plan == 0 || tokens.summary == 0 || tokens.short_form == 0 {
        errors.push("narration.max_tokens: every task budget must be > 0".into());
    }
}
