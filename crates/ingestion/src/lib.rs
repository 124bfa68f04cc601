//! Time axis ingestion and normalization for the gapfix workspace.
//!
//! This crate handles:
//! - Timestamp parsing (text layouts, epoch seconds and milliseconds)
//! - Time axis resolution over an ordered list of rules

pub mod resolver;
pub mod timestamp;

pub use resolver::{AxisHints, ResolvedAxis, TimeAxisResolver};
pub use timestamp::{parse_column, parse_epoch_values, parse_timestamp_str, EpochUnit, ParsedColumn};
