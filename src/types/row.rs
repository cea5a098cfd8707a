//! Core Domain Types
//!
//! Tagged record types for sites, metric rows, and grid cells. Rows are the
//! unit of data flowing through the pipeline: the analytics source produces
//! them, the narrative source appends one, and the reconciler maps them onto
//! grid coordinates.

use serde::{Deserialize, Serialize};

// =============================================================================
// Site
// =============================================================================

/// One configured site: a provider-side property id plus a display name.
///
/// The display name doubles as the worksheet title in the shared spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Analytics property id (e.g. GA4 "properties/123456" without prefix).
    pub property_id: String,
    /// Human-facing name; also the worksheet title.
    pub name: String,
}

impl Site {
    pub fn new(property_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Period Label
// =============================================================================

/// Column-identifying string for one reporting run, typically `YYYY-MM-DD`.
///
/// Derived once per run and threaded explicitly through fetch, reconcile,
/// and persist; never inferred from individual rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabel(pub String);

impl PeriodLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<chrono::NaiveDate> for PeriodLabel {
    fn from(date: chrono::NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }
}

// =============================================================================
// Metric Values & Rows
// =============================================================================

/// Tagged metric payload.
///
/// Replaces the untyped positional tuples of ad-hoc scripts: a value is a
/// whole-number count, a pre-formatted percentage string, or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    /// Whole-number metric (views, users, sessions).
    Count(u64),
    /// Percentage kept as its display string (e.g. "54.3%").
    Percent(String),
    /// Free text (the narrative row).
    Text(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", n),
            Self::Percent(s) | Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One labeled metric observation for one period.
///
/// `label` is the reconciliation key: it decides which grid row the value
/// lands in, across every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub label: String,
    pub period: PeriodLabel,
    pub value: MetricValue,
}

impl MetricRow {
    pub fn new(label: impl Into<String>, period: PeriodLabel, value: MetricValue) -> Self {
        Self {
            label: label.into(),
            period,
            value,
        }
    }

    /// Convenience constructor for count rows.
    pub fn count(label: impl Into<String>, period: &PeriodLabel, n: u64) -> Self {
        Self::new(label, period.clone(), MetricValue::Count(n))
    }

    /// Convenience constructor for text rows.
    pub fn text(label: impl Into<String>, period: &PeriodLabel, text: impl Into<String>) -> Self {
        Self::new(label, period.clone(), MetricValue::Text(text.into()))
    }
}

// =============================================================================
// Grid Cells
// =============================================================================

/// Payload for a single cell of a pending grid column.
///
/// `Empty` slots are written as blank cells so a batch that skips a known
/// item leaves a visible gap in that item's time series.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Count(u64),
    Percent(String),
    Text(String),
}

impl Cell {
    /// Render for spreadsheet output; empty cells become "".
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Count(n) => n.to_string(),
            Self::Percent(s) | Self::Text(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<MetricValue> for Cell {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Count(n) => Cell::Count(n),
            MetricValue::Percent(s) => Cell::Percent(s),
            MetricValue::Text(s) => Cell::Text(s),
        }
    }
}

impl From<&MetricValue> for Cell {
    fn from(value: &MetricValue) -> Self {
        value.clone().into()
    }
}

// =============================================================================
// Grid Snapshot
// =============================================================================

/// What the store reads from a worksheet before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridSnapshot {
    /// Column-1 item labels, in grid order, starting at row 2.
    pub item_labels: Vec<String>,
    /// Number of populated cells in header row 1 (≥ 1 once the caption is
    /// seeded). The next period column is allocated at `header_len + 1`.
    pub header_len: usize,
}

impl GridSnapshot {
    /// 1-based index of the column the next run will write.
    pub fn next_column(&self) -> usize {
        self.header_len + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_label_from_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(PeriodLabel::from(date).as_str(), "2024-01-05");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Empty.to_display_string(), "");
        assert_eq!(Cell::Count(120).to_display_string(), "120");
        assert_eq!(Cell::Percent("54.3%".into()).to_display_string(), "54.3%");
    }

    #[test]
    fn test_cell_from_metric_value() {
        assert_eq!(Cell::from(MetricValue::Count(7)), Cell::Count(7));
        assert_eq!(
            Cell::from(MetricValue::Text("好調".into())),
            Cell::Text("好調".into())
        );
    }

    #[test]
    fn test_next_column_after_caption_only() {
        let snapshot = GridSnapshot {
            item_labels: vec![],
            header_len: 1,
        };
        assert_eq!(snapshot.next_column(), 2);
    }
}
