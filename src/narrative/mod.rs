//! Narrative Generation
//!
//! Defines the NarrativeSource trait for turning one day's metric batch
//! into a short human-readable summary, plus the Gemini and OpenAI
//! providers. The orchestrator owns failure handling: a failed or timed-out
//! generation is replaced by a visible marker string, never an abort.

mod gemini;
mod openai;
mod timeout;

pub use gemini::GeminiNarrator;
pub use openai::OpenAiNarrator;
pub use timeout::with_timeout;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NarrativeConfig;
use crate::constants::narrative::TARGET_CHARS;
use crate::types::{MetricRow, PulseError, Result};

/// Shared narrative source handle for the pipeline.
pub type SharedNarrativeSource = Arc<dyn NarrativeSource>;

/// Generator of one free-text summary row per site per run.
#[async_trait]
pub trait NarrativeSource: Send + Sync {
    /// Summarize the day's metrics for one site (~300 characters).
    async fn summarize(&self, site_name: &str, rows: &[MetricRow]) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a narrative source from configuration.
pub fn create_narrative_source(config: &NarrativeConfig) -> Result<SharedNarrativeSource> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiNarrator::new(config.clone())?)),
        "openai" => Ok(Arc::new(OpenAiNarrator::new(config.clone())?)),
        _ => Err(PulseError::Config(format!(
            "unknown narrative provider: {}. Supported: gemini, openai",
            config.provider
        ))),
    }
}

/// Build the shared summary prompt from the day's rows.
///
/// Both providers send the same prompt; only transport differs.
pub(crate) fn build_prompt(site_name: &str, rows: &[MetricRow]) -> String {
    let mut lines = String::new();
    for row in rows {
        lines.push_str(&format!("- {}: {}\n", row.label, row.value));
    }

    format!(
        "あなたはWebサイトのアクセス解析担当者です。\
サイト「{}」の昨日の指標は以下の通りです。\n\n{}\n\
この数値から読み取れる傾向と簡単な所感を、日本語で約{}文字にまとめてください。\
数値の羅列ではなく、変化や注目点を一言で述べてください。",
        site_name, lines, TARGET_CHARS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeriodLabel;

    #[test]
    fn test_prompt_carries_site_and_rows() {
        let p = PeriodLabel::new("2024-01-01");
        let rows = vec![
            MetricRow::count("★全体PV", &p, 1234),
            MetricRow::count("流入: google", &p, 400),
        ];
        let prompt = build_prompt("Corporate Blog", &rows);
        assert!(prompt.contains("Corporate Blog"));
        assert!(prompt.contains("★全体PV: 1234"));
        assert!(prompt.contains("流入: google: 400"));
        assert!(prompt.contains("300"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = NarrativeConfig {
            provider: "bard".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_narrative_source(&config),
            Err(PulseError::Config(_))
        ));
    }
}
