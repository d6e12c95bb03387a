//! Utility modules for guild scoring
//!
//! Contains shared functionality used across multiple metrics:
//! - Normalization: calibration tables and percentile transformation
//! - Organism counting: shared organism network analysis
//! - LazyFrame helpers: table scanning with column validation

pub mod lazy_helpers;
pub mod normalization;
pub mod organism_counter;

// Re-export commonly used types
pub use lazy_helpers::{materialize_with_columns, scan_table};
pub use normalization::{
    percentile_normalize, Breakpoint, CalibrationTables, Metric, MetricCalibration, SnapshotInfo,
    TierCalibration,
};
pub use organism_counter::{count_shared_organisms, top_organisms, OrganismCount};
