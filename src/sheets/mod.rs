//! Sheet Store Abstraction
//!
//! Owns the persistent per-site grids: row 1 = period labels from column 2,
//! column 1 = item labels from row 2, cell (1,1) = fixed caption. The store
//! translates reconciliation outcomes into grid mutations; it never decides
//! row placement itself.
//!
//! Writes are visible to subsequent reads within the same run — there is no
//! write-behind caching. Concurrent runs against one grid are an accepted
//! race: the next column index comes from a snapshot and is written without
//! compare-and-set (single scheduled invocation is the deployment contract).
//!
//! ## Modules
//!
//! - `a1`: column-letter / range helpers
//! - `google`: Sheets v4 REST backend
//! - `memory`: in-memory backend for tests and `run --dry-run`

pub mod a1;
mod google;
mod memory;

pub use google::GoogleSheetStore;
pub use memory::MemorySheetStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::reconcile::LabelInsertion;
use crate::types::{Cell, GridSnapshot, Result};

/// Shared sheet store handle for the pipeline.
pub type SharedSheetStore = Arc<dyn SheetStore>;

/// Persistent grid backend, one worksheet per site.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Read a worksheet's item labels and header length.
    /// Returns `None` when the worksheet does not exist yet.
    async fn snapshot(&self, sheet: &str) -> Result<Option<GridSnapshot>>;

    /// Create a worksheet with the caption cell seeded, returning its
    /// (empty) snapshot.
    async fn create_sheet(&self, sheet: &str) -> Result<GridSnapshot>;

    /// Persist newly discovered item labels into column 1 at their rows.
    async fn write_labels(&self, sheet: &str, insertions: &[LabelInsertion]) -> Result<()>;

    /// Write one fresh period column starting at row 1 of 1-based `column`.
    /// Existing columns are never overwritten; callers pass
    /// `snapshot.next_column()`.
    async fn write_column(&self, sheet: &str, column: usize, cells: &[Cell]) -> Result<()>;

    /// Check the backing spreadsheet is reachable.
    async fn health_check(&self) -> Result<bool>;
}
