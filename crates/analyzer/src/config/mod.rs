pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load and merge all config JSON files into a single [`AnalyzerConfig`],
/// then apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   analysis.json
///   market_data.json
///   narration.json   (optional)
/// ```
///
/// # Environment variable overrides
///
/// | Env Var                  | Config Field                          |
/// |--------------------------|---------------------------------------|
/// | `BINANCE_API_URL`        | `market_data.base_url`                |
/// | `ANALYZER_QUOTE_ASSET`   | `analysis.quote_asset`                |
/// | `ANALYZER_CANDLE_LIMIT`  | `analysis.candle_limit`               |
/// | `ANALYZER_REFRESH_SECS`  | `analysis.refresh_interval_seconds`   |
/// | `NARRATION_ENABLED`      | `narration.enabled`                   |
/// | `NARRATION_MODEL`        | `narration.model`                     |
/// | `CLAUDE_API_KEY`         | `narration.api_key`                   |
pub fn load_config(config_dir: &Path) -> Result<AnalyzerConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig =
        serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let analysis: AnalysisConfig =
        serde_json::from_str(&read("analysis.json")?).context("parsing analysis.json")?;

    let market_data: MarketDataConfig =
        serde_json::from_str(&read("market_data.json")?).context("parsing market_data.json")?;

    // Narration config is optional.
    let narration: Option<NarrationConfig> = match read("narration.json") {
        Ok(contents) => {
            Some(serde_json::from_str(&contents).context("parsing narration.json")?)
        }
        Err(_) => None,
    };

    let mut config = AnalyzerConfig {
        app,
        analysis,
        market_data,
        narration,
    };

    apply_env_overrides(&mut config);
    config.analysis.quote_asset = config.analysis.quote_asset.trim().to_uppercase();
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides to the loaded config.
///
/// Only non-empty env vars take effect. Parse failures are skipped (the JSON
/// value remains).
fn apply_env_overrides(config: &mut AnalyzerConfig) {
    // -- Market data ---------------------------------------------------------
    if let Some(val) = env_string("BINANCE_API_URL") {
        info!(url = %val, "env override: BINANCE_API_URL");
        config.market_data.base_url = val;
    }

    // -- Analysis ------------------------------------------------------------
    if let Some(val) = env_string("ANALYZER_QUOTE_ASSET") {
        info!(quote = %val, "env override: ANALYZER_QUOTE_ASSET");
        config.analysis.quote_asset = val;
    }

    if let Some(val) = env_parse::<u32>("ANALYZER_CANDLE_LIMIT") {
        info!(val, "env override: ANALYZER_CANDLE_LIMIT");
        config.analysis.candle_limit = val;
    }

    if let Some(val) = env_parse::<u64>("ANALYZER_REFRESH_SECS") {
        info!(val, "env override: ANALYZER_REFRESH_SECS");
        config.analysis.refresh_interval_seconds = Some(val);
    }

    // -- Narration -----------------------------------------------------------
    if let Some(narration) = config.narration.as_mut() {
        if let Some(val) = env_bool("NARRATION_ENABLED") {
            info!(enabled = val, "env override: NARRATION_ENABLED");
            narration.enabled = val;
        }

        if let Some(val) = env_string("NARRATION_MODEL") {
            info!(model = %val, "env override: NARRATION_MODEL");
            narration.model = val;
        }

        if let Some(val) = env_string("CLAUDE_API_KEY") {
            info!("env override: CLAUDE_API_KEY");
            narration.api_key = val;
        }
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var as a bool (`true`, `1`, `yes` → true).
fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
