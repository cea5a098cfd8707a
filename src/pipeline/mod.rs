//! Daily Report Pipeline
//!
//! The orchestrator walks the configured site list in order and runs each
//! site's pipeline to completion before the next starts: fetch metrics →
//! append the narrative row → snapshot (or create) the grid → reconcile →
//! persist labels → persist the fresh column.
//!
//! Failure isolation is the only cross-site contract: one site's failure is
//! logged, classified by stage, and recorded in the run report; the
//! remaining sites still run. Only configuration/credential errors abort
//! the whole run, and those surface before any site is processed.

use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::constants::{grid, labels, narrative as narrative_constants};
use crate::metrics::{MetricSource, SharedMetricSource, create_metric_source};
use crate::narrative::{NarrativeSource, SharedNarrativeSource, create_narrative_source, with_timeout};
use crate::reconcile::reconcile;
use crate::sheets::{GoogleSheetStore, SharedSheetStore, SheetStore};
use crate::types::{FailureStage, MetricRow, PeriodLabel, Result, Site};

// =============================================================================
// Run Report
// =============================================================================

/// What happened to one site in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    /// The column was written.
    Written {
        /// 1-based grid column that was allocated.
        column: usize,
        /// Item labels this run introduced.
        new_labels: usize,
        /// Rows in the batch, narrative included.
        rows: usize,
    },
    /// The provider had no data for the period; nothing was written.
    SkippedNoData,
    /// A pipeline stage failed; nothing further ran for this site.
    Failed {
        stage: FailureStage,
        message: String,
    },
}

/// Per-site outcomes for one run, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(Site, SiteOutcome)>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SiteOutcome::Written { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SiteOutcome::Failed { .. }))
            .count()
    }

    /// True when every site failed (skips don't count as failures).
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.failed() == self.outcomes.len()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Sequential per-site pipeline driver.
pub struct Orchestrator {
    sites: Vec<Site>,
    metrics: SharedMetricSource,
    narrative: SharedNarrativeSource,
    store: SharedSheetStore,
    narrative_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        sites: Vec<Site>,
        metrics: SharedMetricSource,
        narrative: SharedNarrativeSource,
        store: SharedSheetStore,
        narrative_timeout: Duration,
    ) -> Self {
        Self {
            sites,
            metrics,
            narrative,
            store,
            narrative_timeout,
        }
    }

    /// Build the production pipeline from configuration. Fails fast on
    /// missing credentials, before any site is touched.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = std::sync::Arc::new(GoogleSheetStore::new(&config.store, &config.google)?);
        Self::from_config_with_store(config, store)
    }

    /// Same as [`from_config`](Self::from_config) but with a caller-supplied
    /// store (dry runs, tests).
    pub fn from_config_with_store(config: &Config, store: SharedSheetStore) -> Result<Self> {
        config.validate_for_run()?;
        Ok(Self::new(
            config.sites.clone(),
            create_metric_source(&config.analytics, &config.google)?,
            create_narrative_source(&config.narrative)?,
            store,
            Duration::from_secs(config.narrative.timeout_secs),
        ))
    }

    /// Run the pipeline for every configured site, in order.
    pub async fn run(&self, period: &PeriodLabel) -> RunReport {
        let mut report = RunReport::default();

        for site in &self.sites {
            let span = info_span!("site", name = %site.name, period = %period);
            let outcome = async {
                match self.process_site(site, period).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(stage = %e.stage(), "site pipeline failed: {}", e);
                        SiteOutcome::Failed {
                            stage: e.stage(),
                            message: e.to_string(),
                        }
                    }
                }
            }
            .instrument(span)
            .await;

            report.outcomes.push((site.clone(), outcome));
        }

        info!(
            sites = report.outcomes.len(),
            written = report.written(),
            failed = report.failed(),
            "run finished"
        );
        report
    }

    async fn process_site(&self, site: &Site, period: &PeriodLabel) -> Result<SiteOutcome> {
        let mut rows = self.metrics.fetch(site, period).await?;
        if rows.is_empty() {
            warn!("no metrics for period, skipping site");
            return Ok(SiteOutcome::SkippedNoData);
        }
        info!(rows = rows.len(), "fetched metrics");

        // Narrative failures never abort the site; a visible marker row is
        // written instead.
        let text = match with_timeout(
            self.narrative_timeout,
            self.narrative.summarize(&site.name, &rows),
            "narrative generation",
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("narrative generation failed, writing marker: {}", e);
                narrative_constants::FALLBACK_TEXT.to_string()
            }
        };
        rows.push(MetricRow::text(labels::NARRATIVE, period, text));

        let snapshot = match self.store.snapshot(&site.name).await? {
            Some(snapshot) => snapshot,
            None => self.store.create_sheet(&site.name).await?,
        };

        let column_index = snapshot.next_column();
        let outcome = reconcile(snapshot.item_labels, period, &rows, grid::MIN_COLUMN_ROWS);

        self.store.write_labels(&site.name, &outcome.insertions).await?;
        self.store
            .write_column(&site.name, column_index, &outcome.column)
            .await?;

        info!(
            column = column_index,
            new_labels = outcome.insertions.len(),
            "column written"
        );

        Ok(SiteOutcome::Written {
            column: column_index,
            new_labels: outcome.insertions.len(),
            rows: rows.len(),
        })
    }
}

/// The default reporting period: yesterday, local time.
pub fn default_period() -> PeriodLabel {
    let today = chrono::Local::now().date_naive();
    PeriodLabel::from(today.pred_opt().unwrap_or(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{MemorySheetStore, SheetStore};
    use crate::types::{MetricValue, PulseError};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubMetrics {
        /// Per-site batches; missing key means an empty batch.
        batches: std::collections::HashMap<String, Vec<(String, u64)>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl crate::metrics::MetricSource for StubMetrics {
        async fn fetch(&self, site: &Site, period: &PeriodLabel) -> Result<Vec<MetricRow>> {
            if self.fail_for.as_deref() == Some(site.name.as_str()) {
                return Err(PulseError::fetch(&site.name, "boom"));
            }
            Ok(self
                .batches
                .get(&site.name)
                .map(|pairs| {
                    pairs
                        .iter()
                        .map(|(label, n)| MetricRow::count(label.clone(), period, *n))
                        .collect()
                })
                .unwrap_or_default())
        }

        fn name(&self) -> &str {
            "stub"
        }

        async fn health_check(&self, _site: &Site) -> Result<bool> {
            Ok(true)
        }
    }

    struct StubNarrator {
        fail: bool,
    }

    #[async_trait]
    impl crate::narrative::NarrativeSource for StubNarrator {
        async fn summarize(&self, site_name: &str, _rows: &[MetricRow]) -> Result<String> {
            if self.fail {
                Err(PulseError::narrative("stub", "quota"))
            } else {
                Ok(format!("{}は好調です。", site_name))
            }
        }

        fn name(&self) -> &str {
            "stub"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn orchestrator(
        sites: Vec<Site>,
        metrics: StubMetrics,
        narrator: StubNarrator,
        store: Arc<MemorySheetStore>,
    ) -> Orchestrator {
        Orchestrator::new(
            sites,
            Arc::new(metrics),
            Arc::new(narrator),
            store,
            Duration::from_secs(5),
        )
    }

    fn batch(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(l, n)| (l.to_string(), *n)).collect()
    }

    #[tokio::test]
    async fn test_first_run_creates_sheet_and_writes_column_b() {
        let store = Arc::new(MemorySheetStore::new());
        let metrics = StubMetrics {
            batches: [(
                "Blog".to_string(),
                batch(&[("★全体PV", 100), ("★全体UU", 40)]),
            )]
            .into(),
            fail_for: None,
        };
        let orch = orchestrator(
            vec![Site::new("111", "Blog")],
            metrics,
            StubNarrator { fail: false },
            store.clone(),
        );

        let report = orch.run(&PeriodLabel::new("2024-01-01")).await;

        assert_eq!(report.written(), 1);
        assert_eq!(
            report.outcomes[0].1,
            SiteOutcome::Written {
                column: 2,
                new_labels: 3, // two metrics + narrative row
                rows: 3,
            }
        );

        let matrix = store.grid("Blog").await.unwrap();
        assert_eq!(matrix[0][0], grid::CAPTION);
        assert_eq!(matrix[0][1], "2024-01-01");
        assert_eq!(matrix[1][0], "★全体PV");
        assert_eq!(matrix[1][1], "100");
        assert_eq!(matrix[2][1], "40");
        assert_eq!(matrix[3][0], labels::NARRATIVE);
        assert_eq!(matrix[3][1], "Blogは好調です。");
    }

    #[tokio::test]
    async fn test_second_run_appends_column_and_keeps_alignment() {
        let store = Arc::new(MemorySheetStore::new());

        let day1 = orchestrator(
            vec![Site::new("111", "Blog")],
            StubMetrics {
                batches: [(
                    "Blog".to_string(),
                    batch(&[("★全体PV", 100), ("★全体UU", 40)]),
                )]
                .into(),
                fail_for: None,
            },
            StubNarrator { fail: false },
            store.clone(),
        );
        day1.run(&PeriodLabel::new("2024-01-01")).await;

        // Day 2: UU is updated, a new traffic-source label appears, PV is
        // absent and must leave a gap in its own row.
        let day2 = orchestrator(
            vec![Site::new("111", "Blog")],
            StubMetrics {
                batches: [(
                    "Blog".to_string(),
                    batch(&[("★全体UU", 55), ("流入: google", 20)]),
                )]
                .into(),
                fail_for: None,
            },
            StubNarrator { fail: false },
            store.clone(),
        );
        let report = day2.run(&PeriodLabel::new("2024-01-02")).await;

        assert!(matches!(
            report.outcomes[0].1,
            SiteOutcome::Written { column: 3, new_labels: 1, .. }
        ));

        let matrix = store.grid("Blog").await.unwrap();
        // Day 1 column untouched.
        assert_eq!(matrix[0][1], "2024-01-01");
        assert_eq!(matrix[1][1], "100");
        // Day 2 column aligned to the same rows.
        assert_eq!(matrix[0][2], "2024-01-02");
        assert_eq!(matrix[1][0], "★全体PV");
        assert_eq!(matrix[1][2], ""); // gap: no PV row on day 2
        assert_eq!(matrix[2][2], "55");
        // Narrative row keeps its day-1 ordinal; the new label goes below.
        assert_eq!(matrix[3][0], labels::NARRATIVE);
        assert_eq!(matrix[4][0], "流入: google");
        assert_eq!(matrix[4][2], "20");
    }

    #[tokio::test]
    async fn test_narrative_failure_writes_marker_text() {
        let store = Arc::new(MemorySheetStore::new());
        let orch = orchestrator(
            vec![Site::new("111", "Blog")],
            StubMetrics {
                batches: [("Blog".to_string(), batch(&[("★全体PV", 10)]))].into(),
                fail_for: None,
            },
            StubNarrator { fail: true },
            store.clone(),
        );

        let report = orch.run(&PeriodLabel::new("2024-01-01")).await;
        assert_eq!(report.written(), 1);

        let matrix = store.grid("Blog").await.unwrap();
        assert_eq!(matrix[2][1], narrative_constants::FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_empty_fetch_skips_site_without_writing() {
        let store = Arc::new(MemorySheetStore::new());
        let orch = orchestrator(
            vec![Site::new("111", "Blog")],
            StubMetrics {
                batches: Default::default(),
                fail_for: None,
            },
            StubNarrator { fail: false },
            store.clone(),
        );

        let report = orch.run(&PeriodLabel::new("2024-01-01")).await;
        assert_eq!(report.outcomes[0].1, SiteOutcome::SkippedNoData);
        assert!(store.grid("Blog").await.is_none());
    }

    #[tokio::test]
    async fn test_one_failing_site_does_not_stop_the_rest() {
        let store = Arc::new(MemorySheetStore::new());
        let orch = orchestrator(
            vec![Site::new("111", "Broken"), Site::new("222", "Blog")],
            StubMetrics {
                batches: [("Blog".to_string(), batch(&[("★全体PV", 7)]))].into(),
                fail_for: Some("Broken".to_string()),
            },
            StubNarrator { fail: false },
            store.clone(),
        );

        let report = orch.run(&PeriodLabel::new("2024-01-01")).await;

        assert!(matches!(
            report.outcomes[0].1,
            SiteOutcome::Failed {
                stage: FailureStage::Fetch,
                ..
            }
        ));
        assert!(matches!(report.outcomes[1].1, SiteOutcome::Written { .. }));
        assert!(!report.all_failed());
        assert!(store.grid("Blog").await.is_some());
    }

    #[tokio::test]
    async fn test_store_failure_is_classified() {
        // Pre-creating the sheet makes the orchestrator's create_sheet call
        // collide, which the memory store reports as a store error.
        struct CollidingStore(MemorySheetStore);

        #[async_trait]
        impl SheetStore for CollidingStore {
            async fn snapshot(&self, _sheet: &str) -> Result<Option<crate::types::GridSnapshot>> {
                Ok(None)
            }
            async fn create_sheet(&self, sheet: &str) -> Result<crate::types::GridSnapshot> {
                self.0.create_sheet(sheet).await
            }
            async fn write_labels(
                &self,
                sheet: &str,
                insertions: &[crate::reconcile::LabelInsertion],
            ) -> Result<()> {
                self.0.write_labels(sheet, insertions).await
            }
            async fn write_column(
                &self,
                sheet: &str,
                column: usize,
                cells: &[crate::types::Cell],
            ) -> Result<()> {
                self.0.write_column(sheet, column, cells).await
            }
            async fn health_check(&self) -> Result<bool> {
                Ok(true)
            }
        }

        let inner = MemorySheetStore::new();
        inner.create_sheet("Blog").await.unwrap();
        let store = Arc::new(CollidingStore(inner));

        let orch = Orchestrator::new(
            vec![Site::new("111", "Blog")],
            Arc::new(StubMetrics {
                batches: [("Blog".to_string(), batch(&[("★全体PV", 1)]))].into(),
                fail_for: None,
            }),
            Arc::new(StubNarrator { fail: false }),
            store,
            Duration::from_secs(5),
        );

        let report = orch.run(&PeriodLabel::new("2024-01-01")).await;
        assert!(matches!(
            report.outcomes[0].1,
            SiteOutcome::Failed {
                stage: FailureStage::Store,
                ..
            }
        ));
        assert!(report.all_failed());
    }

    #[tokio::test]
    async fn test_narrative_row_value_is_text() {
        // The narrative lands through the same reconciliation path as any
        // metric row, as a Text value.
        let p = PeriodLabel::new("2024-01-01");
        let row = MetricRow::text(labels::NARRATIVE, &p, "所感");
        assert_eq!(row.value, MetricValue::Text("所感".into()));
    }
}
