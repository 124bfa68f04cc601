//! Core types and configuration for the gapfix workspace.
//!
//! This crate provides shared types used across all other crates:
//! - The columnar time series frame
//! - Time axis, frequency and gap types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod frame;
pub mod types;

pub use config::GapFixConfig;
pub use error::{Error, Result};
pub use frame::{Column, ColumnData, ColumnKind, RowIndex, TimeSeriesFrame};
pub use types::*;
