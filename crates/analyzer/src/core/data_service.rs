//! Binance Spot REST market data for the analysis pipeline.
//!
//! Endpoints (all under `market_data.base_url`):
//!   - `/klines`: OHLCV candles per timeframe
//!   - `/exchangeInfo?symbol=`: symbol existence check
//!   - `/ticker/24hr`: 24h change for every pair (sentiment input)
//!
//! Caching (in-memory HashMap with per-endpoint TTL from config):
//!   - Klines: `klines_ttl_seconds`, keyed by symbol, interval and limit
//!   - Exchange info: `exchange_info_ttl_seconds`, keyed by symbol
//!   - 24h tickers: `ticker_ttl_seconds`, single entry
//!
//! Failures are mapped onto [`DataSourceError`] and never retried here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::MarketDataConfig;
use crate::constants::BINANCE_INVALID_SYMBOL_CODE;
use crate::core::market_source::MarketDataSource;
use crate::errors::{AnalysisError, DataSourceError};
use crate::types::{Candle, CandleSeries, TickerChange, Timeframe};

const TICKER_CACHE_KEY: &str = "ticker:24hr";

// ═══════════════════════════════════════════════════════════════════════════
// Cache
// ═══════════════════════════════════════════════════════════════════════════

/// A single cache entry with expiration.
#[derive(Clone)]
struct CacheEntry<T: Clone> {
    data: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Keyed cache with one TTL for every entry.
struct TtlCache<T: Clone> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| e.is_valid())
            .map(|e| e.data.clone())
    }

    fn insert(&self, key: String, data: T) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.is_valid());
        entries.insert(key, CacheEntry::new(data, self.ttl));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BinanceDataService
// ═══════════════════════════════════════════════════════════════════════════

/// [`MarketDataSource`] over the Binance Spot REST API.
pub struct BinanceDataService {
    client: reqwest::Client,
    base_url: String,
    klines: TtlCache<CandleSeries>,
    exchange_info: TtlCache<bool>,
    tickers: TtlCache<Vec<TickerChange>>,
}

impl BinanceDataService {
    pub fn new(config: &MarketDataConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            klines: TtlCache::new(Duration::from_secs(config.klines_ttl_seconds)),
            exchange_info: TtlCache::new(Duration::from_secs(config.exchange_info_ttl_seconds)),
            tickers: TtlCache::new(Duration::from_secs(config.ticker_ttl_seconds)),
        })
    }

    // -----------------------------------------------------------------------
    // Private: HTTP helper
    // -----------------------------------------------------------------------

    /// Issue a GET request to a Binance endpoint and return the parsed JSON.
    async fn binance_get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, DataSourceError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.get(&url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let symbol = params
                .iter()
                .find(|(k, _)| *k == "symbol")
                .map(|(_, v)| *v);
            let err = status_error(status.as_u16(), path, symbol, &body);
            warn!(
                status = status.as_u16(),
                endpoint = path,
                error = %err,
                "Binance request failed"
            );
            return Err(err);
        }

        resp.json::<Value>()
            .await
            .map_err(|e| DataSourceError::Malformed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl MarketDataSource for BinanceDataService {
    /// Binance `/klines` returns `[[open_time, O, H, L, C, V, …], …]`.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<CandleSeries, AnalysisError> {
        let interval = timeframe.as_binance_interval();
        let cache_key = format!("klines:{symbol}:{interval}:{limit}");

        if let Some(series) = self.klines.get(&cache_key) {
            trace!(cache_key = %cache_key, candles = series.len(), "klines cache HIT");
            return Ok(series);
        }
        trace!(cache_key = %cache_key, "klines cache MISS - fetching from API");

        let start = Instant::now();
        let limit_str = limit.to_string();
        let data = self
            .binance_get(
                "/klines",
                &[("symbol", symbol), ("interval", interval), ("limit", &limit_str)],
            )
            .await?;
        let latency = start.elapsed();

        let series = CandleSeries::new(parse_klines(&data)?)?;
        if series.malformed_count() > 0 {
            warn!(
                symbol,
                interval,
                malformed = series.malformed_count(),
                "klines contain candles whose high/low do not bracket open/close"
            );
        }

        debug!(
            symbol,
            interval,
            candles = series.len(),
            latency_ms = latency.as_millis() as u64,
            latest_close = %series.last().close,
            "klines fetched and cached"
        );

        self.klines.insert(cache_key, series.clone());
        Ok(series)
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, AnalysisError> {
        if let Some(exists) = self.exchange_info.get(symbol) {
            trace!(symbol, exists, "exchange info cache HIT");
            return Ok(exists);
        }

        let exists = match self.binance_get("/exchangeInfo", &[("symbol", symbol)]).await {
            Ok(data) => exchange_info_lists(&data, symbol),
            Err(DataSourceError::NotFound { .. }) => false,
            Err(e) => return Err(e.into()),
        };

        debug!(symbol, exists, "symbol lookup");
        self.exchange_info.insert(symbol.to_string(), exists);
        Ok(exists)
    }

    async fn fetch_24h_change_snapshot(&self) -> Result<Vec<TickerChange>, AnalysisError> {
        if let Some(tickers) = self.tickers.get(TICKER_CACHE_KEY) {
            trace!(pairs = tickers.len(), "ticker cache HIT");
            return Ok(tickers);
        }

        let start = Instant::now();
        let data = self.binance_get("/ticker/24hr", &[]).await?;
        let tickers = parse_tickers(&data)?;

        debug!(
            pairs = tickers.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "24h tickers fetched and cached"
        );

        self.tickers.insert(TICKER_CACHE_KEY.to_string(), tickers.clone());
        Ok(tickers)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Free helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Map a non-success HTTP status (and Binance error body) onto a typed error.
fn status_error(status: u16, endpoint: &str, symbol: Option<&str>, body: &str) -> DataSourceError {
    match status {
        429 | 418 => DataSourceError::RateLimited {
            endpoint: endpoint.to_string(),
        },
        400 if binance_error_code(body) == Some(BINANCE_INVALID_SYMBOL_CODE) => {
            DataSourceError::NotFound {
                symbol: symbol.unwrap_or_default().to_string(),
            }
        }
        _ => DataSourceError::Network {
            reason: format!("HTTP {status} from {endpoint}: {body}"),
        },
    }
}

/// `code` field of a Binance error body such as `{"code":-1121,"msg":"Invalid symbol."}`.
fn binance_error_code(body: &str) -> Option<i64> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("code")?
        .as_i64()
}

/// Parse a `serde_json::Value` that may be a number-as-string into `Decimal`.
fn parse_decimal_str(v: &Value) -> Decimal {
    v.as_str()
        .and_then(|s| s.parse::<Decimal>().ok())
        .or_else(|| v.as_f64().and_then(Decimal::from_f64))
        .unwrap_or(Decimal::ZERO)
}

/// Parse a klines array. Rows with fewer than six fields are skipped with a warning;
/// timestamps stay in milliseconds.
fn parse_klines(data: &Value) -> Result<Vec<Candle>, DataSourceError> {
    let arr = data.as_array().ok_or_else(|| DataSourceError::Malformed {
        endpoint: "/klines".into(),
        reason: "response not an array".into(),
    })?;

    let candles: Vec<Candle> = arr
        .iter()
        .filter_map(|k| {
            let items = k.as_array().filter(|a| a.len() >= 6)?;
            Some(Candle {
                timestamp: items[0].as_i64()?,
                open: parse_decimal_str(&items[1]),
                high: parse_decimal_str(&items[2]),
                low: parse_decimal_str(&items[3]),
                close: parse_decimal_str(&items[4]),
                volume: parse_decimal_str(&items[5]),
            })
        })
        .collect();

    let skipped = arr.len() - candles.len();
    if skipped > 0 {
        warn!(skipped, kept = candles.len(), "dropped unparseable kline rows");
    }

    Ok(candles)
}

/// Parse the `/ticker/24hr` array, keeping only symbol and change percent.
fn parse_tickers(data: &Value) -> Result<Vec<TickerChange>, DataSourceError> {
    let arr = data.as_array().ok_or_else(|| DataSourceError::Malformed {
        endpoint: "/ticker/24hr".into(),
        reason: "response not an array".into(),
    })?;

    let tickers: Vec<TickerChange> = arr
        .iter()
        .filter_map(|t| {
            let symbol = t.get("symbol")?.as_str()?;
            let pct = t.get("priceChangePercent")?.as_str()?.parse().ok()?;
            Some(TickerChange {
                symbol: symbol.to_string(),
                price_change_percent: pct,
            })
        })
        .collect();

    let skipped = arr.len() - tickers.len();
    if skipped > 0 {
        warn!(skipped, kept = tickers.len(), "dropped unparseable ticker rows");
    }

    Ok(tickers)
}

/// Whether an `/exchangeInfo` payload lists `symbol`.
fn exchange_info_lists(data: &Value, symbol: &str) -> bool {
    data.get("symbols")
        .and_then(Value::as_array)
        .is_some_and(|symbols| {
            symbols
                .iter()
                .any(|s| s.get("symbol").and_then(Value::as_str) == Some(symbol))
        })
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::io;
    use std::sync::Arc;

    /// In-memory log sink for asserting on emitted events.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        (out, text)
    }

    // -- Decimal parsing -------------------------------------------------------

    #[test]
    fn test_parse_decimal_str_string() {
        assert_eq!(parse_decimal_str(&json!("123.456")), dec!(123.456));
    }

    #[test]
    fn test_parse_decimal_str_number() {
        assert!(parse_decimal_str(&json!(42.5)) > Decimal::ZERO);
    }

    #[test]
    fn test_parse_decimal_str_null() {
        assert_eq!(parse_decimal_str(&json!(null)), Decimal::ZERO);
    }

    // -- Klines ------------------------------------------------------------------

    #[test]
    fn test_parse_klines_response() {
        let data = json!([
            [1700000000000i64, "600.0", "605.0", "595.0", "602.0", "1000.0",
             1700003599999i64, "500000.0", 100, "600.0", "50.0", "0"],
            [1700003600000i64, "602.0", "610.0", "601.0", "608.5", "1200.0",
             1700007199999i64, "700000.0", 120, "650.0", "60.0", "0"]
        ]);
        let candles = parse_klines(&data).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(candles[0].open, dec!(600.0));
        assert_eq!(candles[1].close, dec!(608.5));
        assert_eq!(candles[1].volume, dec!(1200.0));
    }

    #[test]
    fn test_parse_klines_skips_short_rows() {
        let data = json!([
            [1700000000000i64, "600.0", "605.0"],
            [1700003600000i64, "602.0", "610.0", "601.0", "608.5", "1200.0"]
        ]);
        let (candles, logs) = capture_logs(|| parse_klines(&data).unwrap());
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, 1_700_003_600_000);
        assert!(logs.contains("dropped unparseable kline rows"), "logs: {logs}");
        assert!(logs.contains("skipped=1"), "logs: {logs}");
    }

    #[test]
    fn test_parse_klines_rejects_non_array() {
        let err = parse_klines(&json!({"code": -1100})).unwrap_err();
        assert!(matches!(err, DataSourceError::Malformed { .. }));
    }

    #[test]
    fn test_unparsable_price_fails_series_validation() {
        let data = json!([[1700000000000i64, "x", "605.0", "595.0", "602.0", "1.0"]]);
        let candles = parse_klines(&data).unwrap();
        assert!(matches!(
            CandleSeries::new(candles),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    // -- Tickers / exchange info ---------------------------------------------------

    #[test]
    fn test_parse_tickers_keeps_symbol_and_change() {
        let data = json!([
            {"symbol": "BTCUSDT", "priceChange": "120.5", "priceChangePercent": "0.183", "lastPrice": "65000"},
            {"symbol": "ETHBTC", "priceChangePercent": "-1.20"},
            {"symbol": "BROKEN"}
        ]);
        let (tickers, logs) = capture_logs(|| parse_tickers(&data).unwrap());
        assert_eq!(tickers.len(), 2);
        assert!(logs.contains("dropped unparseable ticker rows"), "logs: {logs}");
        assert!(logs.contains("skipped=1"), "logs: {logs}");
        assert_eq!(tickers[0].symbol, "BTCUSDT");
        assert_eq!(tickers[0].price_change_percent, dec!(0.183));
        assert_eq!(tickers[1].price_change_percent, dec!(-1.20));
    }

    #[test]
    fn test_exchange_info_lists_symbol() {
        let data = json!({"timezone": "UTC", "symbols": [{"symbol": "BTCUSDT", "status": "TRADING"}]});
        assert!(exchange_info_lists(&data, "BTCUSDT"));
        assert!(!exchange_info_lists(&data, "ETHUSDT"));
        assert!(!exchange_info_lists(&json!({}), "BTCUSDT"));
    }

    // -- Status mapping --------------------------------------------------------------

    #[test]
    fn test_invalid_symbol_maps_to_not_found() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        let err = status_error(400, "/klines", Some("NOPEUSDT"), body);
        assert!(matches!(err, DataSourceError::NotFound { ref symbol } if symbol == "NOPEUSDT"));
    }

    #[test]
    fn test_other_bad_request_maps_to_network() {
        let body = r#"{"code":-1100,"msg":"Illegal characters found in parameter 'symbol'"}"#;
        let err = status_error(400, "/klines", Some("B@D"), body);
        assert!(matches!(err, DataSourceError::Network { .. }));
    }

    #[test]
    fn test_rate_limit_statuses() {
        for status in [429, 418] {
            let err = status_error(status, "/ticker/24hr", None, "");
            assert!(matches!(err, DataSourceError::RateLimited { .. }));
        }
    }

    #[test]
    fn test_server_error_maps_to_network() {
        let err = status_error(503, "/klines", Some("BTCUSDT"), "Service Unavailable");
        assert!(err.to_string().contains("HTTP 503"));
    }

    // -- Cache -------------------------------------------------------------------

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".into(), 7u32);
        assert_eq!(cache.get("k"), Some(7));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("k".into(), true);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_service_builds_from_default_config() {
        let service = BinanceDataService::new(&MarketDataConfig::default()).unwrap();
        assert_eq!(service.base_url, "https://api.binance.com/api/v3");
    }
}
