//! Gap detection and per-gap row budgets.
//!
//! A gap is a pair of adjacent rows whose separation is strictly greater
//! than a threshold derived from the delta statistics. Two policies decide
//! the threshold and how many synthetic rows a gap may receive:
//!
//! - `Irregular`: `mean + k * std`, rows `clamp(floor(gap / mean), 2, 1000)`.
//! - `Conservative`: on multi-year spans `median * 5` and roughly one row per
//!   30 days of gap, never more than 10; otherwise the irregular threshold
//!   with a cap of 100 rows.

use gapfix_core::config::GapFixConfig;
use gapfix_core::{days_to_ms, Gap, TimestampMs};
use serde::Serialize;

use crate::deltas::DeltaStats;

/// Gap threshold and row budget policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapPolicy {
    /// Statistical threshold, generous row budget.
    Irregular,
    /// Tuned for very long spans to keep row counts bounded.
    Conservative,
}

impl GapPolicy {
    /// Short name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            GapPolicy::Irregular => "irregular",
            GapPolicy::Conservative => "conservative",
        }
    }

    fn is_large_range(self, span_ms: i64, config: &GapFixConfig) -> bool {
        self == GapPolicy::Conservative
            && span_ms > days_to_ms(config.strategy.large_range_min_span_days)
    }

    /// Large range rules need a positive median delta to be meaningful.
    fn uses_median(self, stats: &DeltaStats, span_ms: i64, config: &GapFixConfig) -> bool {
        self.is_large_range(span_ms, config) && stats.median > 0.0
    }

    /// Separation (ms) above which two adjacent rows form a gap.
    ///
    /// A zero median falls back to the irregular `mean + k * std` threshold.
    pub fn threshold_ms(self, stats: &DeltaStats, span_ms: i64, config: &GapFixConfig) -> f64 {
        if self.uses_median(stats, span_ms, config) {
            stats.median * config.conservative.median_multiplier
        } else {
            stats.mean + config.irregular.sigma_multiplier * stats.std_dev
        }
    }

    /// Number of synthetic rows a gap of `gap_ms` may receive.
    pub fn rows_for_gap(
        self,
        gap_ms: i64,
        stats: &DeltaStats,
        span_ms: i64,
        config: &GapFixConfig,
    ) -> usize {
        if self.uses_median(stats, span_ms, config) {
            let cons = &config.conservative;
            let chunks = (gap_ms / days_to_ms(cons.row_chunk_days)).max(0) as usize;
            return chunks.clamp(cons.min_rows_per_gap, cons.max_rows_per_gap);
        }

        let irr = &config.irregular;
        let max = match self {
            GapPolicy::Irregular => irr.max_rows_per_gap,
            GapPolicy::Conservative => config.conservative.moderate_max_rows_per_gap,
        };
        let intervals = if stats.mean > 0.0 {
            (gap_ms as f64 / stats.mean).floor() as usize
        } else {
            0
        };
        intervals.max(irr.min_rows_per_gap).min(max)
    }
}

/// Find every adjacent pair in `sorted` separated by more than `threshold_ms`.
pub fn detect_gaps(sorted: &[TimestampMs], threshold_ms: f64) -> Vec<Gap> {
    if !threshold_ms.is_finite() {
        return Vec::new();
    }
    sorted
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1].saturating_sub(w[0]) as f64 > threshold_ms)
        .map(|(i, w)| Gap {
            left_row: i,
            right_row: i + 1,
            left: w[0],
            right: w[1],
        })
        .collect()
}

/// A gap together with the number of rows it will receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGap {
    pub gap: Gap,
    pub rows: usize,
}

/// Gaps found under a policy, with their budgets.
#[derive(Debug, Clone, PartialEq)]
pub struct GapScan {
    pub policy: GapPolicy,
    pub threshold_ms: f64,
    pub gaps: Vec<PlannedGap>,
}

impl GapScan {
    /// Total synthetic rows planned across all gaps.
    pub fn planned_rows(&self) -> usize {
        self.gaps.iter().map(|g| g.rows).sum()
    }
}

/// Detect gaps under `policy` and assign each its row budget.
///
/// Budgets are capped so that every synthetic timestamp is distinct and
/// strictly inside its gap at millisecond resolution.
pub fn scan_gaps(
    sorted: &[TimestampMs],
    stats: &DeltaStats,
    policy: GapPolicy,
    config: &GapFixConfig,
) -> GapScan {
    let span_ms = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => last.saturating_sub(*first),
        _ => 0,
    };
    let threshold_ms = policy.threshold_ms(stats, span_ms, config);
    let gaps = detect_gaps(sorted, threshold_ms)
        .into_iter()
        .map(|gap| {
            let budget = policy.rows_for_gap(gap.size_ms(), stats, span_ms, config);
            let room = (gap.size_ms() - 1).max(0) as usize;
            PlannedGap {
                rows: budget.min(room),
                gap,
            }
        })
        .filter(|planned| planned.rows > 0)
        .collect();

    GapScan {
        policy,
        threshold_ms,
        gaps,
    }
}

/// Evenly spaced timestamps strictly between the gap boundaries.
///
/// Row `i` of `n` sits at `left + size * i / (n + 1)`.
pub fn synthetic_timestamps(gap: &Gap, rows: usize) -> Vec<TimestampMs> {
    let size = gap.size_ms() as i128;
    let slots = rows as i128 + 1;
    (1..=rows as i128)
        .map(|i| gap.left + (size * i / slots) as i64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapfix_core::DAY_MS;

    const HOUR: i64 = 3_600_000;

    fn stats_for(sorted: &[TimestampMs]) -> DeltaStats {
        DeltaStats::from_deltas(&crate::deltas::consecutive_deltas(sorted)).unwrap()
    }

    fn hourly_with_gap(len: usize, gap_at: usize, gap_hours: i64) -> Vec<TimestampMs> {
        let mut ts = Vec::with_capacity(len);
        let mut t = 0;
        for i in 0..len {
            ts.push(t);
            t += if i == gap_at { gap_hours * HOUR } else { HOUR };
        }
        ts
    }

    #[test]
    fn test_detect_single_gap() {
        let ts = hourly_with_gap(50, 20, 10);
        let stats = stats_for(&ts);
        let config = GapFixConfig::default();
        let threshold = GapPolicy::Irregular.threshold_ms(&stats, ts[49], &config);
        let gaps = detect_gaps(&ts, threshold);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].left_row, 20);
        assert_eq!(gaps[0].right_row, 21);
        assert_eq!(gaps[0].size_ms(), 10 * HOUR);
    }

    #[test]
    fn test_uniform_series_has_no_gaps() {
        let ts: Vec<TimestampMs> = (0..24).map(|i| i * HOUR).collect();
        let stats = stats_for(&ts);
        let scan = scan_gaps(&ts, &stats, GapPolicy::Irregular, &GapFixConfig::default());
        assert!(scan.gaps.is_empty());
        assert_eq!(scan.planned_rows(), 0);
    }

    #[test]
    fn test_irregular_budget_bounds() {
        let config = GapFixConfig::default();
        let stats = DeltaStats {
            count: 10,
            mean: HOUR as f64,
            std_dev: 0.0,
            median: HOUR as f64,
            mode: HOUR,
        };
        let policy = GapPolicy::Irregular;
        assert_eq!(policy.rows_for_gap(HOUR, &stats, 0, &config), 2);
        assert_eq!(policy.rows_for_gap(10 * HOUR, &stats, 0, &config), 10);
        assert_eq!(policy.rows_for_gap(5_000 * HOUR, &stats, 0, &config), 1000);
    }

    #[test]
    fn test_conservative_budget_on_long_span() {
        let config = GapFixConfig::default();
        let stats = DeltaStats {
            count: 100,
            mean: DAY_MS as f64,
            std_dev: 0.0,
            median: DAY_MS as f64,
            mode: DAY_MS,
        };
        let span = 15 * 365 * DAY_MS;
        let policy = GapPolicy::Conservative;
        assert_eq!(policy.threshold_ms(&stats, span, &config), 5.0 * DAY_MS as f64);
        assert_eq!(policy.rows_for_gap(10 * DAY_MS, &stats, span, &config), 1);
        assert_eq!(policy.rows_for_gap(95 * DAY_MS, &stats, span, &config), 3);
        assert_eq!(policy.rows_for_gap(2_000 * DAY_MS, &stats, span, &config), 10);
    }

    #[test]
    fn test_conservative_zero_median_uses_irregular_threshold() {
        let config = GapFixConfig::default();
        let stats = DeltaStats {
            count: 5,
            mean: 6.0 * DAY_MS as f64,
            std_dev: 2.0 * DAY_MS as f64,
            median: 0.0,
            mode: 0,
        };
        let span = 16 * 365 * DAY_MS;
        let threshold = GapPolicy::Conservative.threshold_ms(&stats, span, &config);
        assert_eq!(threshold, 10.0 * DAY_MS as f64);
    }

    #[test]
    fn test_conservative_budget_on_moderate_span() {
        let config = GapFixConfig::default();
        let stats = DeltaStats {
            count: 100,
            mean: HOUR as f64,
            std_dev: 0.0,
            median: HOUR as f64,
            mode: HOUR,
        };
        let policy = GapPolicy::Conservative;
        assert_eq!(policy.rows_for_gap(500 * HOUR, &stats, 40 * DAY_MS, &config), 100);
        assert_eq!(policy.rows_for_gap(50 * HOUR, &stats, 40 * DAY_MS, &config), 50);
    }

    #[test]
    fn test_budget_capped_by_room() {
        // Mean delta of 1ms: a 3ms gap has room for only 2 distinct rows.
        let ts = [0, 1, 2, 3, 4, 7];
        let stats = DeltaStats {
            count: 5,
            mean: 1.0,
            std_dev: 0.0,
            median: 1.0,
            mode: 1,
        };
        let scan = scan_gaps(&ts, &stats, GapPolicy::Irregular, &GapFixConfig::default());
        assert_eq!(scan.gaps.len(), 1);
        assert_eq!(scan.gaps[0].rows, 2);
    }

    #[test]
    fn test_synthetic_timestamps_strictly_inside() {
        let gap = Gap {
            left_row: 0,
            right_row: 1,
            left: 0,
            right: 4 * HOUR,
        };
        assert_eq!(synthetic_timestamps(&gap, 3), vec![HOUR, 2 * HOUR, 3 * HOUR]);

        let odd = Gap {
            left_row: 0,
            right_row: 1,
            left: 100,
            right: 110,
        };
        let ts = synthetic_timestamps(&odd, 9);
        assert_eq!(ts.first(), Some(&101));
        assert_eq!(ts.last(), Some(&109));
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_nan_threshold_yields_no_gaps() {
        assert!(detect_gaps(&[0, 10, 100], f64::NAN).is_empty());
    }
}
