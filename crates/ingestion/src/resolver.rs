//! Time axis resolution.
//!
//! Locates the temporal axis of a frame by running an ordered list of
//! independent rules. The first rule that succeeds wins; each rule is a pure
//! function of the frame and the caller's hints and can be exercised on its
//! own through [`TimeAxisResolver::apply`].

use gapfix_core::config::AxisConfig;
use gapfix_core::{
    representable, AxisRule, ColumnData, GapSummary, RowIndex, TimeAxis, TimeSeriesFrame,
    TimestampMs,
};
use tracing::debug;

use crate::timestamp::{parse_column, parse_epoch_values};

/// Caller-supplied hints about where the timestamps live.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisHints<'a> {
    /// Column named explicitly by the caller.
    pub time_column: Option<&'a str>,
    /// Summary from a previous gap analysis.
    pub summary: Option<&'a GapSummary>,
    /// Preferred layout for text timestamps.
    pub date_format: Option<&'a str>,
}

/// A located time axis with its normalized timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAxis {
    /// Where the timestamps live.
    pub axis: TimeAxis,
    /// Rule that located the axis.
    pub rule: AxisRule,
    /// One timestamp per row of the frame; null where unresolvable.
    pub timestamps: Vec<Option<TimestampMs>>,
}

impl ResolvedAxis {
    /// Number of rows with a null timestamp.
    pub fn null_count(&self) -> usize {
        self.timestamps.iter().filter(|ts| ts.is_none()).count()
    }
}

/// Resolver running the axis rules in their fixed order.
#[derive(Debug, Clone, Default)]
pub struct TimeAxisResolver {
    config: AxisConfig,
}

impl TimeAxisResolver {
    /// Create a resolver from configuration.
    pub fn new(config: AxisConfig) -> Self {
        Self { config }
    }

    /// Locate the time axis, or `None` if no rule succeeds.
    pub fn resolve(&self, frame: &TimeSeriesFrame, hints: &AxisHints<'_>) -> Option<ResolvedAxis> {
        AxisRule::ORDER.into_iter().find_map(|rule| {
            let resolved = self.apply(rule, frame, hints);
            debug!(rule = rule.as_str(), matched = resolved.is_some(), "axis rule evaluated");
            resolved
        })
    }

    /// Evaluate a single rule.
    pub fn apply(
        &self,
        rule: AxisRule,
        frame: &TimeSeriesFrame,
        hints: &AxisHints<'_>,
    ) -> Option<ResolvedAxis> {
        match rule {
            AxisRule::ExplicitColumn => {
                self.named_column(frame, hints.time_column?, rule, hints.date_format)
            }
            AxisRule::SummaryHint => {
                let name = hints.summary?.time_column.as_deref()?;
                self.named_column(frame, name, rule, hints.date_format)
            }
            AxisRule::TemporalType => self.temporal_type(frame),
            AxisRule::NameHeuristic => self.name_heuristic(frame, hints.date_format),
            AxisRule::EpochHeuristic => self.epoch_heuristic(frame),
            AxisRule::TemporalIndex => temporal_index(frame),
        }
    }

    fn named_column(
        &self,
        frame: &TimeSeriesFrame,
        name: &str,
        rule: AxisRule,
        date_format: Option<&str>,
    ) -> Option<ResolvedAxis> {
        let column = frame.column(name)?;
        let parsed = parse_column(&column.data, &self.config, date_format)?;
        Some(ResolvedAxis {
            axis: TimeAxis::Column(column.name.clone()),
            rule,
            timestamps: parsed.values,
        })
    }

    fn temporal_type(&self, frame: &TimeSeriesFrame) -> Option<ResolvedAxis> {
        frame.columns().iter().find_map(|column| match &column.data {
            ColumnData::Timestamp(values) => Some(ResolvedAxis {
                axis: TimeAxis::Column(column.name.clone()),
                rule: AxisRule::TemporalType,
                timestamps: representable(values),
            }),
            _ => None,
        })
    }

    fn name_heuristic(
        &self,
        frame: &TimeSeriesFrame,
        date_format: Option<&str>,
    ) -> Option<ResolvedAxis> {
        frame
            .columns()
            .iter()
            .filter(|column| self.looks_temporal(&column.name))
            .find_map(|column| {
                self.named_column(frame, &column.name, AxisRule::NameHeuristic, date_format)
            })
    }

    fn looks_temporal(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.config
            .temporal_names
            .iter()
            .any(|candidate| lower.contains(&candidate.to_lowercase()))
    }

    fn epoch_heuristic(&self, frame: &TimeSeriesFrame) -> Option<ResolvedAxis> {
        frame.columns().iter().find_map(|column| {
            let numeric = column.data.to_f64()?;
            let mean = mean_of_present(&numeric)?;
            if mean <= self.config.epoch_mean_threshold {
                return None;
            }
            let (timestamps, unit) = parse_epoch_values(&numeric, &self.config)?;
            debug!(column = %column.name, ?unit, "epoch column accepted");
            Some(ResolvedAxis {
                axis: TimeAxis::Column(column.name.clone()),
                rule: AxisRule::EpochHeuristic,
                timestamps,
            })
        })
    }
}

fn temporal_index(frame: &TimeSeriesFrame) -> Option<ResolvedAxis> {
    match frame.index() {
        RowIndex::Temporal(values) => Some(ResolvedAxis {
            axis: TimeAxis::Index,
            rule: AxisRule::TemporalIndex,
            timestamps: representable(values),
        }),
        RowIndex::Positional => None,
    }
}

fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
