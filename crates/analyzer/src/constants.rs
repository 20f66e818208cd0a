// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Binance Spot REST base (klines, exchangeInfo, ticker/24hr live under it).
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Binance error code for an unknown trading pair.
pub const BINANCE_INVALID_SYMBOL_CODE: i64 = -1121;

/// Largest kline page Binance serves in one request.
pub const MAX_CANDLE_LIMIT: u32 = 1000;

pub const DEFAULT_CANDLE_LIMIT: u32 = 200;
pub const DEFAULT_QUOTE_ASSET: &str = "USDT";

// ---------------------------------------------------------------------------
// RSI
// ---------------------------------------------------------------------------

/// RSI reported when the trailing average loss is exactly zero.
pub const RSI_SATURATION: f64 = 100.0;

// ---------------------------------------------------------------------------
// Sentiment bands (percent of advancing pairs, lower bound inclusive)
// ---------------------------------------------------------------------------

pub const SENTIMENT_EXTREME_BULLISH_PCT: u32 = 80;
pub const SENTIMENT_BULLISH_PCT: u32 = 60;
pub const SENTIMENT_NEUTRAL_PCT: u32 = 40;
pub const SENTIMENT_BEARISH_PCT: u32 = 20;

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

pub const NARRATION_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const NARRATION_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_NARRATION_MODEL: &str = "claude-3-opus-20240229";

/// Short-form drafts are cut to this many characters.
pub const SHORT_FORM_MAX_CHARS: usize = 280;

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

pub const MIN_REFRESH_SECONDS: u64 = 30;
pub const MAX_REFRESH_SECONDS: u64 = 300;
