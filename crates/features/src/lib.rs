//! Series statistics for the gapfix workspace.
//!
//! This crate handles:
//! - Consecutive delta statistics (mean, deviation, median, mode)
//! - Dominant frequency estimation
//! - Gap detection and per-gap row budgets
//! - Strategy selection
//! - Gap analysis summaries

pub mod deltas;
pub mod frequency;
pub mod gaps;
pub mod strategy;
pub mod summary;

pub use deltas::{consecutive_deltas, DeltaStats};
pub use frequency::FrequencyEstimator;
pub use gaps::{detect_gaps, scan_gaps, synthetic_timestamps, GapPolicy, GapScan, PlannedGap};
pub use strategy::{Strategy, StrategySelector};
pub use summary::summarize_gaps;
