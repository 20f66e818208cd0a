//! Market-data collaborator seam.
//!
//! The aggregator only ever talks to a `dyn MarketDataSource`, so tests inject
//! fakes and the binary injects [`super::data_service::BinanceDataService`].

use async_trait::async_trait;

use crate::errors::AnalysisError;
use crate::types::{CandleSeries, TickerChange, Timeframe};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Most recent `limit` candles for a full pair symbol (e.g. `BTCUSDT`),
    /// oldest first.
    ///
    /// Transport failures surface as [`AnalysisError::DataSource`]; a payload
    /// that does not form a valid series surfaces as
    /// [`AnalysisError::InvalidInput`].
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<CandleSeries, AnalysisError>;

    /// Whether the venue lists `symbol`. An unknown symbol is `Ok(false)`,
    /// not an error.
    async fn symbol_exists(&self, symbol: &str) -> Result<bool, AnalysisError>;

    /// 24h price change for every listed pair.
    async fn fetch_24h_change_snapshot(&self) -> Result<Vec<TickerChange>, AnalysisError>;
}

/// Full pair symbol for `base` quoted in `quote`, upper-cased.
///
/// A symbol already ending in the quote asset is kept as-is, so both `btc`
/// and `BTCUSDT` resolve to `BTCUSDT`.
pub fn pair_symbol(base: &str, quote: &str) -> String {
    let base = base.trim().to_uppercase();
    let quote = quote.trim().to_uppercase();
    if base.len() > quote.len() && base.ends_with(&quote) {
        base
    } else {
        format!("{base}{quote}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_symbol_appends_quote() {
        assert_eq!(pair_symbol("btc", "USDT"), "BTCUSDT");
        assert_eq!(pair_symbol(" eth ", "usdt"), "ETHUSDT");
    }

    #[test]
    fn test_pair_symbol_keeps_full_pair() {
        assert_eq!(pair_symbol("BTCUSDT", "USDT"), "BTCUSDT");
        assert_eq!(pair_symbol("solusdt", "USDT"), "SOLUSDT");
    }

    #[test]
    fn test_pair_symbol_bare_quote_is_not_a_pair() {
        assert_eq!(pair_symbol("USDT", "USDT"), "USDTUSDT");
    }
}
