use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mtf_analyzer::config;
use mtf_analyzer::core::data_service::BinanceDataService;
use mtf_analyzer::core::{MarketDataSource, MultiTimeframeAggregator};
use mtf_analyzer::logging;
use mtf_analyzer::narration_client::{
    short_form_input, ClaudeNarrationClient, NarrationService, ShortFormStyle,
};
use mtf_analyzer::types::AnalysisReport;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var("ANALYZER_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let config = config::load_config(&config_dir)?;

    // Held for the process lifetime; dropping it stops the file writer.
    let _guard = logging::init_tracing(&config.app.logging)?;

    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "BTC".to_string())
        .to_uppercase();

    info!(
        base = %base,
        quote = %config.analysis.quote_asset,
        timeframes = config.analysis.timeframes.len(),
        narration = config.narration_enabled(),
        "multi-timeframe analyzer starting"
    );

    // -----------------------------------------------------------------------
    // Component construction
    // -----------------------------------------------------------------------

    let source: Arc<dyn MarketDataSource> = Arc::new(
        BinanceDataService::new(&config.market_data).context("failed to build market data client")?,
    );
    let aggregator = MultiTimeframeAggregator::new(Arc::clone(&source), config.analysis.clone());
    let symbol = aggregator.pair_symbol(&base);

    let exists = source
        .symbol_exists(&symbol)
        .await
        .with_context(|| format!("failed to look up {symbol}"))?;
    if !exists {
        bail!("{symbol} is not listed on the exchange");
    }

    let narrator = match config.narration.as_ref() {
        Some(n) if n.enabled => Some(
            ClaudeNarrationClient::new(n).context("failed to build narration client")?,
        ),
        _ => {
            info!("narration disabled");
            None
        }
    };

    // -----------------------------------------------------------------------
    // Shutdown token
    // -----------------------------------------------------------------------

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown signal received, stopping gracefully..."),
                Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
            }
            shutdown.cancel();
        });
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            report = aggregator.build_report(&symbol) => {
                println!("{report}");
                if let Some(narrator) = narrator.as_ref() {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = narrate(narrator, &report) => {}
                    }
                }
            }
        }

        let Some(secs) = config.analysis.refresh_interval_seconds else {
            break;
        };
        info!(secs, "next refresh scheduled");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Print the trading plan, report summary and one short-form draft per style.
/// Drafts see the summary plus the market sentiment line.
/// Each step failing is logged and skipped.
async fn narrate(narrator: &impl NarrationService, report: &AnalysisReport) {
    let symbol = &report.symbol;

    let plan = match narrator.trading_plan(symbol).await {
        Ok(plan) => {
            println!("\n# Trading plan\n\n{plan}");
            plan
        }
        Err(e) => {
            warn!(error = %e, "trading plan unavailable");
            String::new()
        }
    };

    let summary = match narrator.summarize(symbol, &report.timeframes, &plan).await {
        Ok(summary) => {
            println!("\n# Market report\n\n{summary}");
            summary
        }
        Err(e) => {
            warn!(error = %e, "market report unavailable");
            return;
        }
    };

    let source = short_form_input(&summary, &report.sentiment);
    for style in ShortFormStyle::ALL {
        match narrator.draft_short_form(symbol, &source, style).await {
            Ok(draft) => println!("\n[{style}]\n{draft}"),
            Err(e) => warn!(style = %style, error = %e, "short-form draft unavailable"),
        }
    }
}
