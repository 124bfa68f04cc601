//! Bounded gap filling for irregular and long series.
//!
//! Original rows are always kept. Each detected gap receives a bounded
//! number of evenly spaced synthetic rows; numeric cells are weighted by
//! elapsed time between the gap boundaries and other cells are carried from
//! the left boundary. A final time-weighted pass fills interior nulls that
//! were already present in the input.

use gapfix_core::config::GapFixConfig;
use gapfix_core::{Result, TimeSeriesFrame};
use gapfix_features::{consecutive_deltas, scan_gaps, synthetic_timestamps, DeltaStats, GapPolicy};
use tracing::debug;

use crate::plan::{NumericFill, RowPlan, RowSource, WorkingSeries};

/// Result of a fill.
#[derive(Debug, Clone)]
pub struct Filled {
    pub frame: TimeSeriesFrame,
    pub policy: GapPolicy,
    /// Gap threshold used, in milliseconds.
    pub threshold_ms: f64,
    pub gaps: usize,
    pub inserted: usize,
}

/// Inserts synthetic rows into gaps under a [`GapPolicy`].
#[derive(Debug, Clone)]
pub struct GapFiller {
    policy: GapPolicy,
    config: GapFixConfig,
}

impl GapFiller {
    pub fn new(policy: GapPolicy, config: GapFixConfig) -> Self {
        Self { policy, config }
    }

    /// Filler for series up to a decade long: `mean + 2 std` threshold,
    /// between 2 and 1000 rows per gap.
    pub fn irregular(config: GapFixConfig) -> Self {
        Self::new(GapPolicy::Irregular, config)
    }

    /// Filler for multi-year series: `5 * median` threshold, about one row
    /// per 30 days of gap and never more than 10.
    pub fn large_range(config: GapFixConfig) -> Self {
        Self::new(GapPolicy::Conservative, config)
    }

    pub fn policy(&self) -> GapPolicy {
        self.policy
    }

    /// Plan the output rows for `series`.
    ///
    /// A series with fewer than two rows has no deltas and is planned as is.
    pub fn plan(&self, series: &WorkingSeries) -> (RowPlan, f64, usize) {
        let timestamps = series.timestamps();
        let Some(stats) = DeltaStats::from_deltas(&consecutive_deltas(timestamps)) else {
            return (RowPlan::identity(series), f64::NAN, 0);
        };

        let scan = scan_gaps(timestamps, &stats, self.policy, &self.config);
        debug!(
            policy = self.policy.as_str(),
            threshold_ms = scan.threshold_ms,
            gaps = scan.gaps.len(),
            planned_rows = scan.planned_rows(),
            "gap scan complete"
        );

        let mut plan = RowPlan::with_capacity(timestamps.len() + scan.planned_rows());
        let mut gaps = scan.gaps.iter().peekable();
        for (row, &ts) in timestamps.iter().enumerate() {
            plan.push(ts, RowSource::Original(row));
            if let Some(planned) = gaps.next_if(|p| p.gap.left_row == row) {
                let source = RowSource::Synthetic {
                    left: planned.gap.left_row,
                    right: planned.gap.right_row,
                };
                for synthetic in synthetic_timestamps(&planned.gap, planned.rows) {
                    plan.push(synthetic, source);
                }
            }
        }
        plan.ensure_sorted();

        (plan, scan.threshold_ms, scan.gaps.len())
    }

    /// Fill the gaps of `series` and assemble the output frame.
    pub fn fill(&self, series: &WorkingSeries) -> Result<Filled> {
        let (plan, threshold_ms, gaps) = self.plan(series);
        let frame = plan.materialize(series, NumericFill::ByTime)?;
        Ok(Filled {
            frame,
            policy: self.policy,
            threshold_ms,
            gaps,
            inserted: plan.inserted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapfix_core::{AxisRule, Column, ColumnData, TimeAxis, TimestampMs, DAY_MS};
    use gapfix_ingestion::ResolvedAxis;

    const HOUR: i64 = 3_600_000;

    fn series_from(ts: &[TimestampMs], close: &[Option<f64>]) -> WorkingSeries {
        let frame = TimeSeriesFrame::new(vec![
            Column::timestamp("ts", ts.iter().map(|&t| Some(t)).collect()),
            Column::float("close", close.to_vec()),
            Column::text("symbol", vec![Some("BTC"); ts.len()]),
        ])
        .unwrap();
        WorkingSeries::prepare(
            &frame,
            ResolvedAxis {
                axis: TimeAxis::Column("ts".into()),
                rule: AxisRule::TemporalType,
                timestamps: ts.iter().map(|&t| Some(t)).collect(),
            },
        )
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
    fn test_irregular_fill_inserts_inside_gap() {
        let ts = hourly_with_gap(30, 10, 12);
        let close: Vec<Option<f64>> = ts.iter().map(|&t| Some((t / HOUR) as f64)).collect();
        let series = series_from(&ts, &close);

        let filled = GapFiller::irregular(GapFixConfig::default()).fill(&series).unwrap();
        assert_eq!(filled.gaps, 1);
        assert!(filled.inserted >= 2);
        assert_eq!(filled.frame.len(), 30 + filled.inserted);

        let out_ts = match &filled.frame.column("ts").unwrap().data {
            ColumnData::Timestamp(v) => v.iter().map(|t| t.unwrap()).collect::<Vec<_>>(),
            other => panic!("unexpected {other:?}"),
        };
        assert!(out_ts.windows(2).all(|w| w[0] < w[1]));
        for &original in &ts {
            assert!(out_ts.contains(&original));
        }

        // Close equals the hour number, so time weighting keeps it linear.
        if let ColumnData::Float(values) = &filled.frame.column("close").unwrap().data {
            for (t, v) in out_ts.iter().zip(values) {
                let expected = *t as f64 / HOUR as f64;
                assert!((v.unwrap() - expected).abs() < 1e-9);
            }
        } else {
            panic!("close should stay float");
        }

        assert_eq!(
            filled.frame.column("symbol").unwrap().data.null_count(),
            0
        );
    }

    #[test]
    fn test_no_gaps_keeps_rows() {
        let ts: Vec<TimestampMs> = (0..10).map(|i| i * HOUR).collect();
        let series = series_from(&ts, &vec![Some(1.0); 10]);
        let filled = GapFiller::irregular(GapFixConfig::default()).fill(&series).unwrap();
        assert_eq!(filled.gaps, 0);
        assert_eq!(filled.inserted, 0);
        assert_eq!(filled.frame.len(), 10);
    }

    #[test]
    fn test_existing_interior_nulls_filled_by_time() {
        let ts = [0, HOUR, 4 * HOUR];
        let series = series_from(&ts, &[Some(0.0), None, Some(8.0)]);
        let filled = GapFiller::irregular(GapFixConfig::default()).fill(&series).unwrap();
        assert_eq!(filled.inserted, 0);
        assert_eq!(
            filled.frame.column("close").unwrap().data,
            ColumnData::Float(vec![Some(0.0), Some(2.0), Some(8.0)])
        );
    }

    #[test]
    fn test_single_row_is_identity() {
        let series = series_from(&[HOUR], &[Some(1.0)]);
        let filled = GapFiller::irregular(GapFixConfig::default()).fill(&series).unwrap();
        assert_eq!(filled.frame.len(), 1);
        assert_eq!(filled.gaps, 0);
        assert!(filled.threshold_ms.is_nan());
    }

    #[test]
    fn test_large_range_budget() {
        // Daily for 15 years with a 95 day hole in the middle.
        let mut ts: Vec<TimestampMs> = (0..2_700).map(|d| d * DAY_MS).collect();
        ts.extend((2_795..5_500).map(|d| d * DAY_MS));
        let series = series_from(&ts, &vec![Some(1.0); ts.len()]);

        let filled = GapFiller::large_range(GapFixConfig::default()).fill(&series).unwrap();
        assert_eq!(filled.policy, GapPolicy::Conservative);
        assert_eq!(filled.gaps, 1);
        assert_eq!(filled.inserted, 3);
        assert_eq!(filled.threshold_ms, 5.0 * DAY_MS as f64);
    }
}
