//! Configuration Types
//!
//! All configuration structures with sensible defaults. Loaded once at
//! startup and read-only thereafter; the orchestrator receives the site
//! list and store id through this struct, never through globals.

use serde::{Deserialize, Serialize};

use crate::constants::{narrative as narrative_constants, network};
use crate::types::Site;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Sites to report on, in processing order.
    pub sites: Vec<Site>,

    /// Spreadsheet store settings
    pub store: StoreConfig,

    /// Analytics provider settings
    pub analytics: AnalyticsConfig,

    /// Narrative (LLM) provider settings
    pub narrative: NarrativeConfig,

    /// Google API credentials
    pub google: GoogleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            sites: Vec::new(),
            store: StoreConfig::default(),
            analytics: AnalyticsConfig::default(),
            narrative: NarrativeConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PulseError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        use crate::types::PulseError;

        if !(0.0..=2.0).contains(&self.narrative.temperature) {
            return Err(PulseError::Config(format!(
                "narrative temperature must be between 0.0 and 2.0, got {}",
                self.narrative.temperature
            )));
        }

        if self.narrative.timeout_secs == 0 {
            return Err(PulseError::Config(
                "narrative timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.analytics.timeout_secs == 0 {
            return Err(PulseError::Config(
                "analytics timeout_secs must be greater than 0".to_string(),
            ));
        }

        for base in [
            self.analytics.api_base.as_deref(),
            self.narrative.api_base.as_deref(),
            self.store.api_base.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            url::Url::parse(base)
                .map_err(|e| PulseError::Config(format!("invalid api_base '{}': {}", base, e)))?;
        }

        let mut seen_names = std::collections::HashSet::new();
        for site in &self.sites {
            if site.property_id.is_empty() || site.name.is_empty() {
                return Err(PulseError::Config(
                    "every site needs a property_id and a name".to_string(),
                ));
            }
            if !seen_names.insert(site.name.as_str()) {
                return Err(PulseError::Config(format!(
                    "duplicate site name '{}' (names double as worksheet titles)",
                    site.name
                )));
            }
        }

        Ok(())
    }

    /// Validate that a run can actually execute: value ranges plus the
    /// fields `config show` tolerates being absent.
    pub fn validate_for_run(&self) -> crate::types::Result<()> {
        use crate::types::PulseError;

        self.validate()?;

        if self.sites.is_empty() {
            return Err(PulseError::Config(
                "no sites configured; add [[sites]] entries".to_string(),
            ));
        }
        if self.store.spreadsheet_id.is_empty() {
            return Err(PulseError::Config(
                "store.spreadsheet_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Identifier of the shared spreadsheet all site grids live in.
    pub spreadsheet_id: String,

    /// Override for the Sheets API base URL (tests, proxies).
    pub api_base: Option<String>,
}

// =============================================================================
// Analytics Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Override for the GA4 Data API base URL.
    pub api_base: Option<String>,

    /// HTTP timeout for metrics calls, seconds.
    pub timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Narrative Configuration
// =============================================================================

/// Settings for the narrative (LLM) provider.
///
/// Note: the API key is never serialized to output and is redacted in debug
/// output; providers convert it to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Provider type: "gemini" or "openai"
    pub provider: String,

    /// Model name (provider-specific)
    pub model: Option<String>,

    /// Deadline for the generation call, seconds.
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// API key; never serialized to output for security.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: narrative_constants::TIMEOUT_SECS,
            temperature: 0.7,
            api_key: None,
            api_base: None,
        }
    }
}

impl std::fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

// =============================================================================
// Google Credentials
// =============================================================================

/// Credentials shared by the GA4 and Sheets clients.
///
/// Token minting (service-account exchange) happens outside this process;
/// the token arrives via config or the GOOGLE_ACCESS_TOKEN env var.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth2 access token; never serialized to output.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl GoogleConfig {
    /// Resolve the access token from config or environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var("GOOGLE_ACCESS_TOKEN").ok())
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_default_config_cannot_run() {
        assert!(Config::default().validate_for_run().is_err());
    }

    #[test]
    fn test_rejects_bad_temperature() {
        let mut config = Config::default();
        config.narrative.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_site_names() {
        let mut config = Config::default();
        config.sites = vec![Site::new("111", "Blog"), Site::new("222", "Blog")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_api_base() {
        let mut config = Config::default();
        config.analytics.api_base = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.narrative.api_key = Some("sk-secret".to_string());
        config.google.access_token = Some("ya29.secret".to_string());
        let dump = format!("{:?}", config);
        assert!(!dump.contains("sk-secret"));
        assert!(!dump.contains("ya29.secret"));
        assert!(dump.contains("[REDACTED]"));
    }
}
