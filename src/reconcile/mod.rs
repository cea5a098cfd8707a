//! Sheet-Column Reconciliation
//!
//! The core of the pipeline: merges a fresh batch of labeled metric rows
//! into a grid whose row set (item labels) grows monotonically and whose
//! column set (dates) grows by one per run.
//!
//! ## Layout contract
//!
//! The returned column is written starting at grid row 1 of a brand-new
//! column, so slot 0 carries the period label (it lands in the header row)
//! and the item at ordinal `i` of the label list maps to slot `i + 1`.
//!
//! ## Guarantees
//!
//! - Labels are append-only: existing ordinals are never disturbed, unseen
//!   labels are appended in discovery order.
//! - Duplicate labels in the existing list bind to the first occurrence.
//! - The column grows on demand and is never truncated.
//! - Idempotent over the label set; NOT idempotent over columns — every run
//!   allocates a fresh column, so callers must not rerun a period unless a
//!   duplicate column is acceptable.

use std::collections::HashMap;

use crate::types::{Cell, MetricRow, PeriodLabel};

// =============================================================================
// Outcome Types
// =============================================================================

/// A label the current batch introduced, with its position in the label list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInsertion {
    pub label: String,
    /// 0-based position in the final label list.
    pub ordinal: usize,
}

impl LabelInsertion {
    /// 1-based grid row this label must be written to in column 1
    /// (row 1 is the header, so ordinal 0 lives at row 2).
    pub fn grid_row(&self) -> usize {
        self.ordinal + crate::constants::grid::FIRST_LABEL_ROW
    }
}

/// Result of reconciling one batch against one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Full label list after the merge, existing labels first, insertions
    /// appended in discovery order.
    pub labels: Vec<String>,
    /// Labels this batch introduced, for persisting to column 1.
    pub insertions: Vec<LabelInsertion>,
    /// The fresh column, slot 0 = period label, written starting at row 1.
    pub column: Vec<Cell>,
}

// =============================================================================
// Reconcile
// =============================================================================

/// Merge `rows` into the grid described by `existing_labels`, producing the
/// column to write and the label additions to persist.
///
/// `min_capacity` pre-sizes the column for rows not yet known; it is a
/// tuning knob, not a cap. Unknown labels never fail: an empty batch yields
/// an all-empty column except the period slot.
pub fn reconcile(
    existing_labels: Vec<String>,
    period: &PeriodLabel,
    rows: &[MetricRow],
    min_capacity: usize,
) -> ReconcileOutcome {
    let mut labels = existing_labels;

    // First-occurrence index map: duplicate labels in the existing list
    // deterministically bind to the earliest ordinal.
    let mut index: HashMap<String, usize> = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        index.entry(label.clone()).or_insert(i);
    }

    let mut column = vec![Cell::Empty; (labels.len() + 1).max(min_capacity)];
    column[0] = Cell::Text(period.to_string());

    let mut insertions = Vec::new();

    for row in rows {
        let ordinal = match index.get(row.label.as_str()) {
            Some(&i) => i,
            None => {
                let i = labels.len();
                labels.push(row.label.clone());
                index.insert(row.label.clone(), i);
                insertions.push(LabelInsertion {
                    label: row.label.clone(),
                    ordinal: i,
                });
                i
            }
        };

        let slot = ordinal + 1;
        if slot >= column.len() {
            column.resize(slot + 1, Cell::Empty);
        }
        column[slot] = Cell::from(&row.value);
    }

    ReconcileOutcome {
        labels,
        insertions,
        column,
    }
}
