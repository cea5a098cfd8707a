//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Classifies every failure by the pipeline stage it belongs to, so the
//! orchestrator's per-site isolation is an explicit branch instead of a
//! caught exception.
//!
//! ## Failure Taxonomy
//!
//! - **Fetch**: the analytics provider returned nothing usable (skip site)
//! - **Narrative**: the text-generation call failed (substitute marker text)
//! - **Store**: the spreadsheet read/write failed (skip site, keep going)
//! - **Config** / **MissingCredentials**: fatal, abort before any site runs

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Failure Stages
// =============================================================================

/// Pipeline stage a failure is attributed to.
///
/// Drives the orchestrator's per-site isolation: only `Config` failures are
/// fatal to the whole run; everything else is confined to one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Metrics fetch from the analytics provider.
    Fetch,
    /// Narrative text generation.
    Narrative,
    /// Spreadsheet read/write.
    Store,
    /// Configuration or credentials (fatal).
    Config,
    /// Anything else (treated as per-site).
    Other,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Narrative => write!(f, "narrative"),
            Self::Store => write!(f, "store"),
            Self::Config => write!(f, "config"),
            Self::Other => write!(f, "other"),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum PulseError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// No usable metrics came back for a site.
    #[error("metrics fetch failed for {site}: {message}")]
    Fetch { site: String, message: String },

    /// Narrative generation failed; the orchestrator substitutes marker text.
    #[error("narrative generation failed ({provider}): {message}")]
    Narrative { provider: String, message: String },

    /// Spreadsheet read or write failed.
    #[error("sheet store error on '{sheet}': {message}")]
    Store { sheet: String, message: String },

    /// Operation exceeded its deadline.
    #[error("timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors (fatal before any site is processed)
    // -------------------------------------------------------------------------
    #[error("config error: {0}")]
    Config(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

pub type Result<T> = std::result::Result<T, PulseError>;

// =============================================================================
// Helper Constructors & Classification
// =============================================================================

impl PulseError {
    /// Create a fetch error for a site.
    pub fn fetch(site: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            site: site.into(),
            message: message.into(),
        }
    }

    /// Create a narrative-generation error.
    pub fn narrative(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Narrative {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a store error for a worksheet.
    pub fn store(sheet: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            sheet: sheet.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Which pipeline stage this error belongs to.
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Fetch { .. } => FailureStage::Fetch,
            Self::Narrative { .. } | Self::Timeout { .. } => FailureStage::Narrative,
            Self::Store { .. } => FailureStage::Store,
            Self::Config(_) | Self::MissingCredentials(_) => FailureStage::Config,
            Self::Io(_) | Self::Json(_) | Self::Http(_) => FailureStage::Other,
        }
    }

    /// Whether this error must abort the whole run rather than one site.
    pub fn is_fatal(&self) -> bool {
        self.stage() == FailureStage::Config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_classification() {
        assert_eq!(
            PulseError::fetch("blog", "no rows").stage(),
            FailureStage::Fetch
        );
        assert_eq!(
            PulseError::store("blog", "404").stage(),
            FailureStage::Store
        );
        assert_eq!(
            PulseError::timeout("narrative", Duration::from_secs(60)).stage(),
            FailureStage::Narrative
        );
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(PulseError::Config("bad".into()).is_fatal());
        assert!(PulseError::MissingCredentials("token".into()).is_fatal());
        assert!(!PulseError::fetch("blog", "empty").is_fatal());
        assert!(!PulseError::store("blog", "quota").is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = PulseError::narrative("gemini", "quota exceeded");
        let msg = err.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("quota exceeded"));
    }
}
