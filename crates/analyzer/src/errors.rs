use thiserror::Error;

use crate::types::timeframe::Timeframe;

/// Typed error hierarchy for the analysis engine.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum AnalysisError {
    // -- Input --------------------------------------------------------------
    #[error("invalid candle series: {reason}")]
    InvalidInput { reason: String },

    // -- Warm-up ------------------------------------------------------------
    #[error("indicator `{field}` undefined at row {index} (series too short for warm-up)")]
    InsufficientData { field: &'static str, index: usize },

    #[error("insufficient history: need {required} candles, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    // -- Sentiment ----------------------------------------------------------
    #[error("no {quote_asset} pairs in ticker snapshot")]
    NoData { quote_asset: String },

    // -- Report -------------------------------------------------------------
    #[error("primary timeframe {timeframe} missing from report")]
    PrimaryTimeframeMissing { timeframe: Timeframe },

    #[error("analysis task for {timeframe} did not complete: {reason}")]
    TaskFailed { timeframe: Timeframe, reason: String },

    // -- Collaborators ------------------------------------------------------
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("narration failed: {reason}")]
    Narration { reason: String },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Failures reported by the market-data collaborator.
///
/// Retry policy belongs to the caller; the engine never retries.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

impl From<reqwest::Error> for DataSourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network {
            reason: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        Self::DataSource(e.into())
    }
}
