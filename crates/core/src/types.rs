//! Core data types shared by every layer of the gap fixing engine.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Milliseconds in one second.
pub const SECOND_MS: i64 = 1_000;

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

/// Convert a whole number of days to milliseconds.
#[inline]
pub fn days_to_ms(days: i64) -> i64 {
    days.saturating_mul(DAY_MS)
}

/// Convert a timestamp to a UTC datetime, if it is representable.
#[inline]
pub fn to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// Null out timestamps that fall outside the calendar range.
pub fn representable(values: &[Option<TimestampMs>]) -> Vec<Option<TimestampMs>> {
    values
        .iter()
        .map(|ts| ts.filter(|&t| to_datetime(t).is_some()))
        .collect()
}

/// Calendar year of a timestamp, if it is representable.
pub fn year_of(ts_ms: TimestampMs) -> Option<i32> {
    to_datetime(ts_ms).map(|dt| dt.year())
}

/// Render a timestamp for diagnostics (RFC 3339, or raw millis if out of range).
pub fn format_ts(ts_ms: TimestampMs) -> String {
    match to_datetime(ts_ms) {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{}ms", ts_ms),
    }
}

/// Where the timestamp of a frame lives.
///
/// Exactly one axis is resolved per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeAxis {
    /// A named column.
    Column(String),
    /// The frame's row index.
    Index,
}

impl fmt::Display for TimeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeAxis::Column(name) => write!(f, "column '{}'", name),
            TimeAxis::Index => write!(f, "row index"),
        }
    }
}

/// The axis resolution rule that located a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisRule {
    /// Column named by the caller.
    ExplicitColumn,
    /// Column named by a gap summary hint.
    SummaryHint,
    /// Column whose declared type is temporal.
    TemporalType,
    /// Column whose name looks temporal.
    NameHeuristic,
    /// Numeric column holding plausible epoch values.
    EpochHeuristic,
    /// Temporal row index.
    TemporalIndex,
}

impl AxisRule {
    /// All rules in resolution order.
    pub const ORDER: [AxisRule; 6] = [
        AxisRule::ExplicitColumn,
        AxisRule::SummaryHint,
        AxisRule::TemporalType,
        AxisRule::NameHeuristic,
        AxisRule::EpochHeuristic,
        AxisRule::TemporalIndex,
    ];

    /// Short name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AxisRule::ExplicitColumn => "explicit_column",
            AxisRule::SummaryHint => "summary_hint",
            AxisRule::TemporalType => "temporal_type",
            AxisRule::NameHeuristic => "name_heuristic",
            AxisRule::EpochHeuristic => "epoch_heuristic",
            AxisRule::TemporalIndex => "temporal_index",
        }
    }
}

/// Dominant sampling interval of a series.
///
/// A valid frequency always holds a positive step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Most frequent consecutive delta.
    Mode(i64),
    /// Median consecutive delta, used when the mode is zero.
    Median(i64),
    /// No usable step could be derived.
    Invalid,
}

impl Frequency {
    /// Build a mode-derived frequency, rejecting non-positive steps.
    pub fn mode(step_ms: i64) -> Self {
        if step_ms > 0 {
            Frequency::Mode(step_ms)
        } else {
            Frequency::Invalid
        }
    }

    /// Build a median-derived frequency, rejecting non-positive steps.
    pub fn median(step_ms: i64) -> Self {
        if step_ms > 0 {
            Frequency::Median(step_ms)
        } else {
            Frequency::Invalid
        }
    }

    /// Step in milliseconds, if valid.
    pub fn step_ms(&self) -> Option<i64> {
        match *self {
            Frequency::Mode(step) | Frequency::Median(step) => Some(step),
            Frequency::Invalid => None,
        }
    }

    /// Whether the frequency can drive a regular grid.
    pub fn is_valid(&self) -> bool {
        self.step_ms().is_some()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Mode(step) => write!(f, "{}ms (mode)", step),
            Frequency::Median(step) => write!(f, "{}ms (median)", step),
            Frequency::Invalid => write!(f, "invalid"),
        }
    }
}

/// A pair of temporally adjacent rows separated by more than the gap threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Position of the left boundary row in the sorted series.
    pub left_row: usize,
    /// Position of the right boundary row in the sorted series.
    pub right_row: usize,
    /// Left boundary timestamp.
    pub left: TimestampMs,
    /// Right boundary timestamp.
    pub right: TimestampMs,
}

impl Gap {
    /// Duration of the gap in milliseconds.
    #[inline]
    pub fn size_ms(&self) -> i64 {
        self.right.saturating_sub(self.left)
    }
}

/// Summary produced by gap analysis, accepted back as an axis hint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapSummary {
    /// Column holding the timestamps, if analysis found one.
    #[serde(alias = "datetime_column")]
    pub time_column: Option<String>,
    /// Number of gaps detected.
    pub total_gaps: Option<usize>,
    /// Largest gap in milliseconds.
    pub largest_gap_ms: Option<i64>,
    /// Estimated sampling step in milliseconds.
    pub estimated_step_ms: Option<i64>,
}

impl GapSummary {
    /// Parse a summary from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_rejects_non_positive() {
        assert_eq!(Frequency::mode(0), Frequency::Invalid);
        assert_eq!(Frequency::median(-5), Frequency::Invalid);
        assert_eq!(Frequency::mode(60_000).step_ms(), Some(60_000));
        assert!(Frequency::median(1).is_valid());
        assert!(!Frequency::Invalid.is_valid());
    }

    #[test]
    fn test_gap_size() {
        let gap = Gap {
            left_row: 3,
            right_row: 4,
            left: 1_000,
            right: 61_000,
        };
        assert_eq!(gap.size_ms(), 60_000);
    }

    #[test]
    fn test_gap_size_saturates() {
        let gap = Gap {
            left_row: 0,
            right_row: 1,
            left: i64::MIN + 1,
            right: i64::MAX - 1,
        };
        assert_eq!(gap.size_ms(), i64::MAX);
    }

    #[test]
    fn test_representable_drops_out_of_range() {
        let values = [Some(i64::MIN + 1), Some(0), None, Some(i64::MAX - 1)];
        assert_eq!(representable(&values), vec![None, Some(0), None, None]);
    }

    #[test]
    fn test_year_of() {
        // 2024-01-01T00:00:00Z
        assert_eq!(year_of(1_704_067_200_000), Some(2024));
        assert_eq!(year_of(0), Some(1970));
    }

    #[test]
    fn test_summary_alias() {
        let summary = GapSummary::from_json(r#"{"datetime_column": "open_time", "total_gaps": 4}"#)
            .unwrap();
        assert_eq!(summary.time_column.as_deref(), Some("open_time"));
        assert_eq!(summary.total_gaps, Some(4));
        assert_eq!(summary.largest_gap_ms, None);
    }

    #[test]
    fn test_axis_display() {
        assert_eq!(TimeAxis::Column("date".into()).to_string(), "column 'date'");
        assert_eq!(TimeAxis::Index.to_string(), "row index");
        assert_eq!(AxisRule::ORDER[0], AxisRule::ExplicitColumn);
    }
}
