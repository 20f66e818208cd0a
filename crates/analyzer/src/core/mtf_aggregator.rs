//! Multi-timeframe analysis over an injected market-data source.
//!
//! One fetch per configured timeframe, dispatched concurrently and bounded by
//! `analysis.max_concurrency`. Each task computes its own frame and snapshot;
//! results land in pre-sized slots indexed by configured position, so report
//! order never depends on completion order. A failed timeframe is omitted
//! from the report, never fatal for the run.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, IndicatorParams};
use crate::core::indicators::compute_frame;
use crate::core::market_source::{pair_symbol, MarketDataSource};
use crate::core::sentiment::score_sentiment;
use crate::core::trend_classifier::classify;
use crate::errors::AnalysisError;
use crate::types::{AnalysisReport, MultiTimeframeReport, SentimentStatus, Timeframe, TrendSnapshot};

type SlotOutcome = (usize, Result<TrendSnapshot, AnalysisError>);

/// Runs the indicator engine and trend classifier across timeframes.
pub struct MultiTimeframeAggregator {
    source: Arc<dyn MarketDataSource>,
    config: AnalysisConfig,
}

impl MultiTimeframeAggregator {
    pub fn new(source: Arc<dyn MarketDataSource>, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Full pair symbol for a user-supplied base symbol.
    pub fn pair_symbol(&self, base: &str) -> String {
        pair_symbol(base, &self.config.quote_asset)
    }

    /// Analyse `symbol` (a full pair, e.g. `BTCUSDT`) on every configured
    /// timeframe.
    pub async fn analyze(&self, symbol: &str) -> MultiTimeframeReport {
        let timeframes = &self.config.timeframes;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<SlotOutcome> = JoinSet::new();

        for (slot, &timeframe) in timeframes.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let params = self.config.indicators.clone();
            let symbol = symbol.to_string();
            let limit = self.config.candle_limit;

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await;
                let outcome =
                    analyze_timeframe(source.as_ref(), &symbol, timeframe, limit, &params).await;
                (slot, outcome)
            });
        }

        let mut slots: Vec<Option<Result<TrendSnapshot, AnalysisError>>> =
            timeframes.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => warn!(error = %e, "task join error during multi-tf analysis"),
            }
        }

        let outcomes: Vec<_> = timeframes
            .iter()
            .zip(slots)
            .map(|(&timeframe, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    Err(AnalysisError::TaskFailed {
                        timeframe,
                        reason: "task aborted before reporting".into(),
                    })
                });
                if let Err(e) = &outcome {
                    warn!(
                        symbol,
                        timeframe = %timeframe,
                        error = %e,
                        "timeframe omitted from report"
                    );
                }
                (timeframe, outcome)
            })
            .collect();

        let report = MultiTimeframeReport::from_outcomes(self.config.primary_timeframe, outcomes);
        info!(
            symbol,
            analysed = report.len(),
            omitted = report.omitted().len(),
            "multi-timeframe analysis complete"
        );
        report
    }

    /// Breadth sentiment over the configured quote asset. Failures are
    /// reported as [`SentimentStatus::Unavailable`].
    pub async fn market_sentiment(&self) -> SentimentStatus {
        let quote = &self.config.quote_asset;
        let scored = match self.source.fetch_24h_change_snapshot().await {
            Ok(tickers) => score_sentiment(&tickers, quote),
            Err(e) => Err(e),
        };

        match scored {
            Ok(result) => SentimentStatus::Available(result),
            Err(e) => {
                warn!(quote = %quote, error = %e, "market sentiment unavailable");
                SentimentStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Timeframe analysis and sentiment for `symbol`, bundled for consumers.
    pub async fn build_report(&self, symbol: &str) -> AnalysisReport {
        let (timeframes, sentiment) = tokio::join!(self.analyze(symbol), self.market_sentiment());
        AnalysisReport::new(symbol, timeframes, sentiment)
    }
}

/// Fetch, compute and classify one timeframe.
async fn analyze_timeframe(
    source: &dyn MarketDataSource,
    symbol: &str,
    timeframe: Timeframe,
    limit: u32,
    params: &IndicatorParams,
) -> Result<TrendSnapshot, AnalysisError> {
    let series = source.fetch_candles(symbol, timeframe, limit).await?;
    let frame = compute_frame(&series, params);
    let snapshot = classify(&series, &frame, params)?;

    debug!(
        symbol,
        timeframe = %timeframe,
        candles = series.len(),
        ma20_trend = %snapshot.ma20_trend,
        macd = %snapshot.macd_analysis.direction,
        rsi = snapshot.rsi_analysis.value,
        "timeframe analysed"
    );
    Ok(snapshot)
}
