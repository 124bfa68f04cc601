//! Gap detection and regularization of time series frames.
//!
//! This crate handles:
//! - The gap fixing pipeline and its report
//! - Regular reindexing onto a uniform grid
//! - Bounded gap filling for irregular and multi-year series
//! - Interpolation of interior numeric nulls
//! - Diagnostics routed through an injectable sink

pub mod diagnostics;
pub mod fixer;
pub mod interpolate;
pub mod irregular;
pub mod plan;
pub mod regular;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, GapFixEvent, Level, TracingSink};
pub use fixer::{
    fix_gaps, Fallback, GapFixOptions, GapFixOutcome, GapFixReport, GapFixer, Stage, Terminal,
    UnchangedReason,
};
pub use irregular::{Filled, GapFiller};
pub use plan::{NumericFill, RowPlan, RowSource, WorkingSeries};
pub use regular::{Grid, GridError, MergeError, RegularError, RegularReindexer, Reindexed};
