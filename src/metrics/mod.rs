//! Metric Source Abstraction
//!
//! Defines the MetricSource trait for pulling one site's labeled metric
//! batch for one reporting period, plus the GA4 implementation.

mod ga4;

pub use ga4::Ga4MetricSource;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{AnalyticsConfig, GoogleConfig};
use crate::types::{MetricRow, PeriodLabel, Result, Site};

/// Shared metric source handle for the pipeline.
pub type SharedMetricSource = Arc<dyn MetricSource>;

/// Source of labeled metric rows for one site and one period.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the ordered metric batch: aggregate rows first, then the
    /// traffic-source / landing-page / country breakdowns, all sharing
    /// `period`. An empty batch means the site produced no data and the
    /// caller must skip it.
    async fn fetch(&self, site: &Site, period: &PeriodLabel) -> Result<Vec<MetricRow>>;

    /// Source name for logging
    fn name(&self) -> &str;

    /// Check whether the provider answers for this site
    async fn health_check(&self, site: &Site) -> Result<bool>;
}

/// Create the metric source from configuration.
pub fn create_metric_source(
    analytics: &AnalyticsConfig,
    google: &GoogleConfig,
) -> Result<SharedMetricSource> {
    Ok(Arc::new(Ga4MetricSource::new(analytics, google)?))
}
