//! Gap analysis producing a [`GapSummary`].
//!
//! The summary names the resolved time column, so it can be handed back to
//! the gap fixer as an axis hint.

use gapfix_core::config::GapFixConfig;
use gapfix_core::{GapSummary, TimeAxis, TimeSeriesFrame, TimestampMs};
use gapfix_ingestion::{AxisHints, TimeAxisResolver};
use tracing::debug;

use crate::deltas::{consecutive_deltas, DeltaStats};
use crate::frequency::FrequencyEstimator;
use crate::gaps::{scan_gaps, GapPolicy};

/// Analyse the gaps of a frame without changing it.
///
/// Returns `None` when no time axis can be resolved. Gap counting uses the
/// irregular threshold (`mean + k * std` of the deltas).
pub fn summarize_gaps(
    frame: &TimeSeriesFrame,
    hints: &AxisHints<'_>,
    config: &GapFixConfig,
) -> Option<GapSummary> {
    let resolved = TimeAxisResolver::new(config.axis.clone()).resolve(frame, hints)?;

    let time_column = match &resolved.axis {
        TimeAxis::Column(name) => Some(name.clone()),
        TimeAxis::Index => None,
    };

    let mut sorted: Vec<TimestampMs> = resolved.timestamps.iter().flatten().copied().collect();
    sorted.sort_unstable();

    let Some(stats) = DeltaStats::from_deltas(&consecutive_deltas(&sorted)) else {
        return Some(GapSummary {
            time_column,
            total_gaps: Some(0),
            ..Default::default()
        });
    };

    let scan = scan_gaps(&sorted, &stats, GapPolicy::Irregular, config);
    let largest_gap_ms = scan.gaps.iter().map(|g| g.gap.size_ms()).max();
    debug!(
        axis = %resolved.axis,
        gaps = scan.gaps.len(),
        threshold_ms = scan.threshold_ms,
        "gap analysis complete"
    );

    Some(GapSummary {
        time_column,
        total_gaps: Some(scan.gaps.len()),
        largest_gap_ms,
        estimated_step_ms: FrequencyEstimator.from_stats(&stats).step_ms(),
    })
}
