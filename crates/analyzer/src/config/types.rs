use serde::Deserialize;

use crate::constants;
use crate::types::timeframe::Timeframe;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub app: AppConfig,
    pub analysis: AnalysisConfig,
    pub market_data: MarketDataConfig,
    pub narration: Option<NarrationConfig>,
}

impl AnalyzerConfig {
    /// Whether narration is configured and switched on.
    pub fn narration_enabled(&self) -> bool {
        self.narration.as_ref().is_some_and(|n| n.enabled)
    }
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub file_name: String,
    /// Rotated files kept on disk.
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub default_filter: String,
}

fn default_log_file() -> String {
    "analyzer.log".to_string()
}

fn default_max_log_files() -> usize {
    7
}

fn default_log_filter() -> String {
    "mtf_analyzer=info,warn".to_string()
}

// ---------------------------------------------------------------------------
// analysis.json
// ---------------------------------------------------------------------------

/// Engine configuration passed into the aggregator at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Report order; fixed to 5m, 15m, 1h, 4h, 1d by default.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<Timeframe>,
    /// Timeframe whose snapshot supplies the displayed price.
    #[serde(default = "default_primary_timeframe")]
    pub primary_timeframe: Timeframe,
    /// Candles requested per timeframe.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,
    /// Quote currency appended to the base symbol and used to filter tickers.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Upper bound on in-flight timeframe fetches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Re-run interval for the binary; `None` runs once.
    #[serde(default)]
    pub refresh_interval_seconds: Option<u64>,
    #[serde(default)]
    pub indicators: IndicatorParams,
}

fn default_timeframes() -> Vec<Timeframe> {
    Timeframe::ALL.to_vec()
}

fn default_primary_timeframe() -> Timeframe {
    Timeframe::D1
}

fn default_candle_limit() -> u32 {
    constants::DEFAULT_CANDLE_LIMIT
}

fn default_quote_asset() -> String {
    constants::DEFAULT_QUOTE_ASSET.to_string()
}

fn default_max_concurrency() -> usize {
    Timeframe::ALL.len()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeframes: default_timeframes(),
            primary_timeframe: default_primary_timeframe(),
            candle_limit: default_candle_limit(),
            quote_asset: default_quote_asset(),
            max_concurrency: default_max_concurrency(),
            refresh_interval_seconds: None,
            indicators: IndicatorParams::default(),
        }
    }
}

/// Window lengths and thresholds for the indicator engine and classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    /// MA / Bollinger window.
    pub ma_period: usize,
    /// Band half-width in sample standard deviations.
    pub band_std_mult: f64,
    /// Trailing mean window over the MA first difference.
    pub trend_smoothing: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// Candles spanned by the price/RSI divergence comparison.
    pub divergence_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_period: 20,
            band_std_mult: 2.0,
            trend_smoothing: 5,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            divergence_lookback: 5,
        }
    }
}

impl IndicatorParams {
    /// Shortest series the classifier accepts: MACD slow span plus the
    /// divergence lookback.
    #[must_use]
    pub fn min_history(&self) -> usize {
        self.macd_slow + self.divergence_lookback
    }
}

// ---------------------------------------------------------------------------
// market_data.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_binance_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_klines_ttl")]
    pub klines_ttl_seconds: u64,
    #[serde(default = "default_exchange_info_ttl")]
    pub exchange_info_ttl_seconds: u64,
    #[serde(default = "default_ticker_ttl")]
    pub ticker_ttl_seconds: u64,
}

fn default_binance_url() -> String {
    constants::BINANCE_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_klines_ttl() -> u64 {
    30
}

fn default_exchange_info_ttl() -> u64 {
    300
}

fn default_ticker_ttl() -> u64 {
    30
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_binance_url(),
            request_timeout_seconds: default_request_timeout(),
            klines_ttl_seconds: default_klines_ttl(),
            exchange_info_ttl_seconds: default_exchange_info_ttl(),
            ticker_ttl_seconds: default_ticker_ttl(),
        }
    }
}

// ---------------------------------------------------------------------------
// narration.json (optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NarrationConfig {
    pub enabled: bool,
    #[serde(default = "default_narration_url")]
    pub api_url: String,
    #[serde(default = "default_narration_model")]
    pub model: String,
    /// Usually supplied through `CLAUDE_API_KEY` rather than the file.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_narration_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub max_tokens: NarrationTokens,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationTokens {
    pub trading_plan: u32,
    pub summary: u32,
    pub short_form: u32,
}

impl Default for NarrationTokens {
    fn default() -> Self {
        Self {
            trading_plan: 1000,
            summary: 2000,
            short_form: 500,
        }
    }
}

fn default_narration_url() -> String {
    constants::NARRATION_API_URL.to_string()
}

fn default_narration_model() -> String {
    constants::DEFAULT_NARRATION_MODEL.to_string()
}

fn default_narration_timeout() -> u64 {
    60
}
