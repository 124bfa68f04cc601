//! Dominant sampling frequency estimation.
//!
//! The mode of the consecutive deltas captures the typical cadence even when
//! a few large gaps are present. When the mode is zero (duplicate timestamps
//! dominate) the median is used instead; a zero median marks the frequency
//! invalid.

use gapfix_core::{Frequency, TimestampMs};

use crate::deltas::{consecutive_deltas, DeltaStats};

/// Estimator of the dominant sampling interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyEstimator;

impl FrequencyEstimator {
    /// Estimate the frequency of a sorted, non-null timestamp sequence.
    ///
    /// Fewer than two timestamps yield [`Frequency::Invalid`].
    pub fn estimate(&self, sorted: &[TimestampMs]) -> Frequency {
        match DeltaStats::from_deltas(&consecutive_deltas(sorted)) {
            Some(stats) => self.from_stats(&stats),
            None => Frequency::Invalid,
        }
    }

    /// Estimate the frequency from precomputed delta statistics.
    pub fn from_stats(&self, stats: &DeltaStats) -> Frequency {
        if stats.mode > 0 {
            return Frequency::mode(stats.mode);
        }
        if !stats.median.is_finite() {
            return Frequency::Invalid;
        }
        Frequency::median(stats.median.round() as i64)
    }
}
