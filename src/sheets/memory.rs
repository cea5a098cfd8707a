//! In-Memory Sheet Store
//!
//! Grid backend backed by plain string matrices. Used by the pipeline tests
//! and by `run --dry-run`, where it records exactly what the Google backend
//! would have written.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::SheetStore;
use crate::constants::grid;
use crate::reconcile::LabelInsertion;
use crate::types::{Cell, GridSnapshot, PulseError, Result};

/// Row-major string grid, 0-based internally.
type Matrix = Vec<Vec<String>>;

/// In-memory sheet store; one string matrix per worksheet title.
#[derive(Debug, Default)]
pub struct MemorySheetStore {
    grids: Mutex<BTreeMap<String, Matrix>>,
}

impl MemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of one worksheet's matrix, for assertions and dry-run output.
    pub async fn grid(&self, sheet: &str) -> Option<Matrix> {
        self.grids.lock().await.get(sheet).cloned()
    }

    /// Titles of all worksheets created so far.
    pub async fn sheet_names(&self) -> Vec<String> {
        self.grids.lock().await.keys().cloned().collect()
    }

    fn set(matrix: &mut Matrix, row0: usize, col0: usize, value: String) {
        if matrix.len() <= row0 {
            matrix.resize(row0 + 1, Vec::new());
        }
        let row = &mut matrix[row0];
        if row.len() <= col0 {
            row.resize(col0 + 1, String::new());
        }
        row[col0] = value;
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn snapshot(&self, sheet: &str) -> Result<Option<GridSnapshot>> {
        let grids = self.grids.lock().await;
        let Some(matrix) = grids.get(sheet) else {
            return Ok(None);
        };

        let mut item_labels: Vec<String> = matrix
            .iter()
            .skip(grid::FIRST_LABEL_ROW - 1)
            .map(|row| row.first().cloned().unwrap_or_default())
            .collect();
        while item_labels.last().is_some_and(String::is_empty) {
            item_labels.pop();
        }

        let header_len = matrix
            .first()
            .map(|row| {
                let mut len = row.len();
                while len > 0 && row[len - 1].is_empty() {
                    len -= 1;
                }
                len
            })
            .unwrap_or(0);

        Ok(Some(GridSnapshot {
            item_labels,
            header_len: header_len.max(1),
        }))
    }

    async fn create_sheet(&self, sheet: &str) -> Result<GridSnapshot> {
        let mut grids = self.grids.lock().await;
        if grids.contains_key(sheet) {
            return Err(PulseError::store(sheet, "worksheet already exists"));
        }
        grids.insert(sheet.to_string(), vec![vec![grid::CAPTION.to_string()]]);

        Ok(GridSnapshot {
            item_labels: Vec::new(),
            header_len: 1,
        })
    }

    async fn write_labels(&self, sheet: &str, insertions: &[LabelInsertion]) -> Result<()> {
        let mut grids = self.grids.lock().await;
        let matrix = grids
            .get_mut(sheet)
            .ok_or_else(|| PulseError::store(sheet, "worksheet not found"))?;

        for ins in insertions {
            Self::set(matrix, ins.grid_row() - 1, 0, ins.label.clone());
        }
        Ok(())
    }

    async fn write_column(&self, sheet: &str, column: usize, cells: &[Cell]) -> Result<()> {
        let mut grids = self.grids.lock().await;
        let matrix = grids
            .get_mut(sheet)
            .ok_or_else(|| PulseError::store(sheet, "worksheet not found"))?;

        for (i, cell) in cells.iter().enumerate() {
            Self::set(matrix, i, column - 1, cell.to_display_string());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_of_missing_sheet_is_none() {
        let store = MemorySheetStore::new();
        assert_eq!(store.snapshot("Blog").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_seeds_caption() {
        let store = MemorySheetStore::new();
        let snapshot = store.create_sheet("Blog").await.unwrap();
        assert_eq!(snapshot.header_len, 1);
        assert_eq!(snapshot.next_column(), 2);

        let matrix = store.grid("Blog").await.unwrap();
        assert_eq!(matrix[0][0], grid::CAPTION);
    }

    #[tokio::test]
    async fn test_double_create_fails() {
        let store = MemorySheetStore::new();
        store.create_sheet("Blog").await.unwrap();
        assert!(store.create_sheet("Blog").await.is_err());
    }

    #[tokio::test]
    async fn test_labels_and_column_round_trip_through_snapshot() {
        let store = MemorySheetStore::new();
        store.create_sheet("Blog").await.unwrap();

        store
            .write_labels(
                "Blog",
                &[
                    LabelInsertion {
                        label: "★全体PV".into(),
                        ordinal: 0,
                    },
                    LabelInsertion {
                        label: "★全体UU".into(),
                        ordinal: 1,
                    },
                ],
            )
            .await
            .unwrap();

        store
            .write_column(
                "Blog",
                2,
                &[
                    Cell::Text("2024-01-01".into()),
                    Cell::Count(100),
                    Cell::Count(40),
                ],
            )
            .await
            .unwrap();

        let snapshot = store.snapshot("Blog").await.unwrap().unwrap();
        assert_eq!(snapshot.item_labels, vec!["★全体PV", "★全体UU"]);
        assert_eq!(snapshot.header_len, 2);
        assert_eq!(snapshot.next_column(), 3);

        let matrix = store.grid("Blog").await.unwrap();
        assert_eq!(matrix[0][1], "2024-01-01");
        assert_eq!(matrix[1][1], "100");
        assert_eq!(matrix[2][1], "40");
    }

    #[tokio::test]
    async fn test_header_len_ignores_trailing_empty_cells() {
        let store = MemorySheetStore::new();
        store.create_sheet("Blog").await.unwrap();
        // A column write longer than the label list leaves empty header
        // slots only below row 1, never in it; but an explicitly empty
        // period cell must not inflate the header.
        store
            .write_column("Blog", 2, &[Cell::Text("2024-01-01".into()), Cell::Empty])
            .await
            .unwrap();
        store
            .write_column("Blog", 3, &[Cell::Empty, Cell::Count(5)])
            .await
            .unwrap();

        let snapshot = store.snapshot("Blog").await.unwrap().unwrap();
        assert_eq!(snapshot.header_len, 2);
    }
}
