//! Core Types
//!
//! Domain records and the unified error type.

pub mod error;
pub mod row;

pub use error::{FailureStage, PulseError, Result};
pub use row::{Cell, GridSnapshot, MetricRow, MetricValue, PeriodLabel, Site};
