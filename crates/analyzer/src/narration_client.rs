//! Narration client: turns a computed report into prose via the Anthropic
//! Messages API.
//!
//! The engine never depends on this module. The binary calls it after the
//! report is assembled, only when `narration.enabled` is set.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{NarrationConfig, NarrationTokens};
use crate::constants::{NARRATION_API_VERSION, SHORT_FORM_MAX_CHARS};
use crate::errors::AnalysisError;
use crate::types::{MultiTimeframeReport, SentimentStatus};

// ═══════════════════════════════════════════════════════════════════════════
// Service seam
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait NarrationService: Send + Sync {
    /// Trend-following trading plan for `symbol`.
    async fn trading_plan(&self, symbol: &str) -> Result<String, AnalysisError>;

    /// Markdown market report built from the multi-timeframe snapshots and a plan.
    async fn summarize(
        &self,
        symbol: &str,
        report: &MultiTimeframeReport,
        plan: &str,
    ) -> Result<String, AnalysisError>;

    /// Social-media draft of at most 280 characters.
    async fn draft_short_form(
        &self,
        symbol: &str,
        summary: &str,
        style: ShortFormStyle,
    ) -> Result<String, AnalysisError>;
}

/// Voice for short-form drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortFormStyle {
    Playful,
    Trader,
    Analyst,
    RektTrader,
}

impl ShortFormStyle {
    pub const ALL: [ShortFormStyle; 4] = [
        ShortFormStyle::Playful,
        ShortFormStyle::Trader,
        ShortFormStyle::Analyst,
        ShortFormStyle::RektTrader,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Playful => "playful",
            Self::Trader => "trader",
            Self::Analyst => "analyst",
            Self::RektTrader => "rekt-trader",
        }
    }

    /// Tone instruction placed in the prompt.
    pub const fn tone(&self) -> &'static str {
        match self {
            Self::Playful => "cheerful and playful",
            Self::Trader => "concise and professional",
            Self::Analyst => "rigorous and analytical",
            Self::RektTrader => "sarcastic and self-deprecating",
        }
    }
}

impl fmt::Display for ShortFormStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShortFormStyle {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AnalysisError::Narration {
                reason: format!("unknown short-form style {s:?}"),
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Prompts
// ═══════════════════════════════════════════════════════════════════════════

pub fn trading_plan_prompt(symbol: &str) -> String {
    format!(
        "You are a professional cryptocurrency trader. Provide a detailed trend-following \
         trading plan for {symbol}, including entry points, stop-loss levels, price targets \
         and position sizing."
    )
}

/// Summary prompt with the report embedded as JSON.
pub fn summary_prompt(
    symbol: &str,
    report: &MultiTimeframeReport,
    plan: &str,
) -> Result<String, AnalysisError> {
    let analysis = serde_json::to_string_pretty(report)?;
    Ok(format!(
        r#"As a professional cryptocurrency analyst, write a detailed market report for {symbol} based on the multi-timeframe analysis below.

Trend analysis per timeframe:
{analysis}

Trading plan:
{plan}

Use markdown with these sections:

## Market overview
[Overall view within the multi-timeframe framework]

## Trend analysis
- Short term (5m-15m): trend, bull/bear strength, overbought/oversold:
- Medium term (1h-4h): trend, bull/bear strength, overbought/oversold:
- Long term (daily): trend, bull/bear strength, overbought/oversold:
- Alignment across timeframes:

## Key levels
- Main resistance:
- Main support:
- Where the current price sits:

## Targets
1. 24h target:
2. 3-day target:
3. 7-day target:

## Recommendations
- Short-term trades:
- Medium-term positioning:
- Risks:

Keep the analysis objective and relate the timeframes to one another."#
    ))
}

/// Short-form source text: the narrated summary followed by the sentiment line.
pub fn short_form_input(summary: &str, sentiment: &SentimentStatus) -> String {
    format!("{}\n{sentiment}", summary.trim_end())
}

pub fn short_form_prompt(symbol: &str, summary: &str, style: ShortFormStyle) -> String {
    format!(
        "In a {} tone, write a post analysing {symbol} (price, trend, recommendation), \
         at most {SHORT_FORM_MAX_CHARS} characters:\n{summary}",
        style.tone()
    )
}

/// Cut `text` to the short-form limit, ending in `...` when shortened.
pub fn truncate_short_form(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SHORT_FORM_MAX_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(SHORT_FORM_MAX_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

// ═══════════════════════════════════════════════════════════════════════════
// Messages API client
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessagesResponse {
    /// Concatenated text blocks; `None` when the reply has no text.
    fn into_text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// [`NarrationService`] backed by the Anthropic Messages API.
pub struct ClaudeNarrationClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: NarrationTokens,
}

impl ClaudeNarrationClient {
    pub fn new(config: &NarrationConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AnalysisError::Narration {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens.clone(),
        })
    }

    async fn complete(
        &self,
        task: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        let start = Instant::now();
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", NARRATION_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Narration {
                reason: if e.is_timeout() {
                    format!("{task}: request timed out")
                } else {
                    format!("{task}: request failed: {e}")
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(task, status = status.as_u16(), "narration request rejected");
            return Err(AnalysisError::Narration {
                reason: format!("{task}: API returned {status}: {body}"),
            });
        }

        let text = response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| AnalysisError::Narration {
                reason: format!("{task}: failed to parse response: {e}"),
            })?
            .into_text()
            .ok_or_else(|| AnalysisError::Narration {
                reason: format!("{task}: response contained no text"),
            })?;

        debug!(
            task,
            model = %self.model,
            chars = text.chars().count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "narration generated"
        );
        Ok(text)
    }
}

#[async_trait]
impl NarrationService for ClaudeNarrationClient {
    async fn trading_plan(&self, symbol: &str) -> Result<String, AnalysisError> {
        self.complete("trading_plan", &trading_plan_prompt(symbol), self.max_tokens.trading_plan)
            .await
    }

    async fn summarize(
        &self,
        symbol: &str,
        report: &MultiTimeframeReport,
        plan: &str,
    ) -> Result<String, AnalysisError> {
        let prompt = summary_prompt(symbol, report, plan)?;
        self.complete("summary", &prompt, self.max_tokens.summary).await
    }

    async fn draft_short_form(
        &self,
        symbol: &str,
        summary: &str,
        style: ShortFormStyle,
    ) -> Result<String, AnalysisError> {
        let prompt = short_form_prompt(symbol, summary, style);
        let text = self
            .complete("short_form", &prompt, self.max_tokens.short_form)
            .await?;
        Ok(truncate_short_form(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SentimentLabel, SentimentResult, Timeframe};
    use rust_decimal::Decimal;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_short_form("  BTC holding 65k  "), "BTC holding 65k");
        let exact = "a".repeat(280);
        assert_eq!(truncate_short_form(&exact), exact);
    }

    #[test]
    fn test_long_text_cut_to_limit() {
        let out = truncate_short_form(&"b".repeat(281));
        assert_eq!(out.chars().count(), 280);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..277], "b".repeat(277));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let out = truncate_short_form(&"比".repeat(300));
        assert_eq!(out.chars().count(), 280);
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("rekt-trader".parse::<ShortFormStyle>().unwrap(), ShortFormStyle::RektTrader);
        assert_eq!("Analyst".parse::<ShortFormStyle>().unwrap(), ShortFormStyle::Analyst);
        assert!("influencer".parse::<ShortFormStyle>().is_err());
    }

    #[test]
    fn test_short_form_prompt_carries_tone_and_limit() {
        let prompt = short_form_prompt("BTCUSDT", "daily trend up", ShortFormStyle::Trader);
        assert!(prompt.contains("concise and professional"));
        assert!(prompt.contains("280 characters"));
        assert!(prompt.ends_with("daily trend up"));
    }

    #[test]
    fn test_short_form_input_appends_sentiment_line() {
        let sentiment = SentimentStatus::Available(SentimentResult {
            advancing: 3,
            total: 4,
            up_ratio_percent: Decimal::from(75),
            label: SentimentLabel::Bullish,
        });
        let input = short_form_input("daily trend up\n", &sentiment);
        assert_eq!(
            input,
            "daily trend up\nmarket sentiment: bullish (advancing pairs 75.00%)"
        );

        let prompt = short_form_prompt("BTCUSDT", &input, ShortFormStyle::Playful);
        assert!(prompt.contains("\nmarket sentiment: bullish"));

        let unavailable = SentimentStatus::Unavailable {
            reason: "timeout".into(),
        };
        assert!(short_form_input("summary", &unavailable)
            .ends_with("market sentiment unavailable: timeout"));
    }

    #[test]
    fn test_summary_prompt_embeds_report() {
        let report = MultiTimeframeReport::from_outcomes(Timeframe::D1, Vec::new());
        let prompt = summary_prompt("ETHUSDT", &report, "buy dips").unwrap();
        assert!(prompt.contains("ETHUSDT"));
        assert!(prompt.contains("{}"));
        assert!(prompt.contains("buy dips"));
        assert!(prompt.contains("## Targets"));
    }

    #[test]
    fn test_response_text_blocks_joined() {
        let json = r#"{"id":"msg_1","content":[{"type":"text","text":"Hello "},{"type":"tool_use","id":"x"},{"type":"text","text":"world"}]}"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.into_text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_empty_response_is_none() {
        let resp: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(resp.into_text().is_none());
    }

    #[test]
    fn test_request_shape() {
        let req = MessagesRequest {
            model: "claude-3-opus-20240229",
            max_tokens: 500,
            messages: [Message {
                role: "user",
                content: "hi",
            }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["max_tokens"], 500);
        assert_eq!(v["messages"][0]["role"], "user");
    }
}
