//! SitePulse - Daily Web-Analytics Snapshot Logger
//!
//! Pulls yesterday's GA4 metrics for a configured set of sites, appends an
//! AI-generated narrative summary, and writes the combined batch as one new
//! column into each site's worksheet of a shared spreadsheet.
//!
//! ## Core Pieces
//!
//! - **Reconciler**: maps a growing set of labeled metric rows onto a
//!   persistent grid with append-only rows and one fresh column per run
//! - **Metric source**: GA4 Data API client behind a trait
//! - **Narrative source**: Gemini/OpenAI providers behind a trait
//! - **Sheet store**: Google Sheets backend plus an in-memory double
//! - **Orchestrator**: sequential site loop with per-site failure isolation
//!
//! ## Quick Start
//!
//! ```ignore
//! use sitepulse::{ConfigLoader, Orchestrator, pipeline::default_period};
//!
//! let config = ConfigLoader::load()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let report = orchestrator.run(&default_period()).await;
//! ```
//!
//! ## Modules
//!
//! - [`reconcile`]: the sheet-column reconciliation core
//! - [`metrics`], [`narrative`], [`sheets`]: external collaborators
//! - [`pipeline`]: the orchestrator and run report
//! - [`config`]: figment-based configuration

pub mod config;
pub mod constants;
pub mod metrics;
pub mod narrative;
pub mod pipeline;
pub mod reconcile;
pub mod sheets;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{FailureStage, PulseError, Result};

// Domain
pub use types::{Cell, GridSnapshot, MetricRow, MetricValue, PeriodLabel, Site};

// Reconciliation
pub use reconcile::{LabelInsertion, ReconcileOutcome, reconcile};

// Pipeline
pub use pipeline::{Orchestrator, RunReport, SiteOutcome};

// =============================================================================
// Collaborator Re-exports
// =============================================================================

pub use metrics::{Ga4MetricSource, MetricSource};
pub use narrative::{GeminiNarrator, NarrativeSource, OpenAiNarrator};
pub use sheets::{GoogleSheetStore, MemorySheetStore, SheetStore};
