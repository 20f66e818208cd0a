//! Breadth sentiment from a 24h ticker snapshot.
//!
//! Only pairs quoted in the configured asset are counted. The advancing share
//! is computed in `Decimal` so band boundaries compare exactly.

use rust_decimal::Decimal;
use tracing::debug;

use crate::constants::{
    SENTIMENT_BEARISH_PCT, SENTIMENT_BULLISH_PCT, SENTIMENT_EXTREME_BULLISH_PCT,
    SENTIMENT_NEUTRAL_PCT,
};
use crate::errors::AnalysisError;
use crate::types::{SentimentLabel, SentimentResult, TickerChange};

/// Score market breadth over every `*{quote_asset}` pair in `tickers`.
/// The quote asset matches without regard to case.
///
/// # Errors
///
/// [`AnalysisError::NoData`] when no ticker matches the quote asset.
pub fn score_sentiment(
    tickers: &[TickerChange],
    quote_asset: &str,
) -> Result<SentimentResult, AnalysisError> {
    let quote = quote_asset.to_ascii_uppercase();
    let (advancing, total) = tickers
        .iter()
        .filter(|t| t.symbol.to_ascii_uppercase().ends_with(&quote))
        .fold((0usize, 0usize), |(up, n), t| {
            (up + usize::from(t.price_change_percent > Decimal::ZERO), n + 1)
        });

    if total == 0 {
        return Err(AnalysisError::NoData {
            quote_asset: quote_asset.to_string(),
        });
    }

    let up_ratio_percent =
        Decimal::ONE_HUNDRED * Decimal::from(advancing) / Decimal::from(total);
    let label = classify_ratio(up_ratio_percent);

    debug!(
        quote = quote_asset,
        advancing,
        total,
        ratio = %up_ratio_percent,
        label = %label,
        "sentiment scored"
    );

    Ok(SentimentResult {
        label,
        up_ratio_percent,
        advancing,
        total,
    })
}

/// Bands evaluated top-down, lower bound inclusive.
pub fn classify_ratio(up_ratio_percent: Decimal) -> SentimentLabel {
    let at_least = |pct: u32| up_ratio_percent >= Decimal::from(pct);

    if at_least(SENTIMENT_EXTREME_BULLISH_PCT) {
        SentimentLabel::ExtremeBullish
    } else if at_least(SENTIMENT_BULLISH_PCT) {
        SentimentLabel::Bullish
    } else if at_least(SENTIMENT_NEUTRAL_PCT) {
        SentimentLabel::Neutral
    } else if at_least(SENTIMENT_BEARISH_PCT) {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::ExtremeBearish
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, pct: Decimal) -> TickerChange {
        TickerChange {
            symbol: symbol.to_string(),
            price_change_percent: pct,
        }
    }

    /// `total` USDT pairs of which the first `advancing` are up.
    fn snapshot(advancing: usize, total: usize) -> Vec<TickerChange> {
        (0..total)
            .map(|i| {
                let pct = if i < advancing { dec!(1.5) } else { dec!(-0.7) };
                ticker(&format!("C{i}USDT"), pct)
            })
            .collect()
    }

    #[test]
    fn test_exactly_eighty_percent_is_extreme_bullish() {
        let result = score_sentiment(&snapshot(800, 1000), "USDT").unwrap();
        assert_eq!(result.up_ratio_percent, dec!(80));
        assert_eq!(result.label, SentimentLabel::ExtremeBullish);
    }

    #[test]
    fn test_seventy_nine_point_nine_is_bullish() {
        let result = score_sentiment(&snapshot(799, 1000), "USDT").unwrap();
        assert_eq!(result.up_ratio_percent, dec!(79.9));
        assert_eq!(result.label, SentimentLabel::Bullish);
    }

    #[test]
    fn test_band_lower_bounds_inclusive() {
        assert_eq!(classify_ratio(dec!(60)), SentimentLabel::Bullish);
        assert_eq!(classify_ratio(dec!(40)), SentimentLabel::Neutral);
        assert_eq!(classify_ratio(dec!(20)), SentimentLabel::Bearish);
        assert_eq!(classify_ratio(dec!(19.99)), SentimentLabel::ExtremeBearish);
        assert_eq!(classify_ratio(Decimal::ZERO), SentimentLabel::ExtremeBearish);
        assert_eq!(classify_ratio(Decimal::ONE_HUNDRED), SentimentLabel::ExtremeBullish);
    }

    #[test]
    fn test_unchanged_pairs_do_not_advance() {
        let tickers = vec![
            ticker("AUSDT", dec!(0)),
            ticker("BUSDT", dec!(0.01)),
            ticker("CUSDT", dec!(-2)),
            ticker("DUSDT", dec!(0.00)),
        ];
        let result = score_sentiment(&tickers, "USDT").unwrap();
        assert_eq!(result.advancing, 1);
        assert_eq!(result.total, 4);
        assert_eq!(result.up_ratio_percent, dec!(25));
        assert_eq!(result.label, SentimentLabel::Bearish);
    }

    #[test]
    fn test_other_quote_assets_filtered_out() {
        let tickers = vec![
            ticker("BTCUSDT", dec!(2)),
            ticker("ETHBTC", dec!(-1)),
            ticker("BNBFDUSD", dec!(-1)),
        ];
        let result = score_sentiment(&tickers, "USDT").unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.label, SentimentLabel::ExtremeBullish);
    }

    #[test]
    fn test_lowercase_quote_asset_matches_pairs() {
        let tickers = vec![ticker("BTCUSDT", dec!(1)), ticker("ETHBTC", dec!(-1))];
        let result = score_sentiment(&tickers, "usdt").unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.advancing, 1);
        assert_eq!(result.label, SentimentLabel::ExtremeBullish);
    }

    #[test]
    fn test_no_matching_pairs_is_no_data() {
        let tickers = vec![ticker("ETHBTC", dec!(1))];
        let err = score_sentiment(&tickers, "USDT").unwrap_err();
        assert!(matches!(err, AnalysisError::NoData { ref quote_asset } if quote_asset == "USDT"));
        assert!(matches!(score_sentiment(&[], "USDT"), Err(AnalysisError::NoData { .. })));
    }
}
