//! Statistics over consecutive timestamp deltas.
//!
//! Every strategy depends on these global statistics, so they are computed
//! once over the whole sorted series before any row is emitted.

use gapfix_core::TimestampMs;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;

/// Consecutive differences of a sorted timestamp sequence, in ms.
///
/// Differences too large for an `i64` saturate.
pub fn consecutive_deltas(sorted: &[TimestampMs]) -> Vec<i64> {
    sorted.windows(2).map(|w| w[1].saturating_sub(w[0])).collect()
}

/// Summary statistics of a delta sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaStats {
    /// Number of deltas.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; zero for a single delta.
    pub std_dev: f64,
    /// Median (mean of the two middle values for an even count).
    pub median: f64,
    /// Most frequent delta; the smallest one wins a tie.
    pub mode: i64,
}

impl DeltaStats {
    /// Compute statistics, or `None` for an empty delta sequence.
    pub fn from_deltas(deltas: &[i64]) -> Option<Self> {
        if deltas.is_empty() {
            return None;
        }

        let values: Vec<f64> = deltas.iter().map(|&d| d as f64).collect();
        let mean = values.iter().mean();
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };
        let median = Data::new(values).median();

        Some(Self {
            count: deltas.len(),
            mean,
            std_dev,
            median,
            mode: mode_of(deltas),
        })
    }
}

fn mode_of(deltas: &[i64]) -> i64 {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &d in deltas {
        *counts.entry(d).or_insert(0) += 1;
    }

    // BTreeMap iterates ascending, so a strict comparison keeps the smallest tie.
    let mut best = (deltas[0], 0usize);
    for (&delta, &count) in &counts {
        if count > best.1 {
            best = (delta, count);
        }
    }
    best.0
}
