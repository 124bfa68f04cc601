//! Regular reindexing onto a uniform grid.
//!
//! The grid runs from the first to the last timestamp at the estimated step.
//! Rows are first snapped to their nearest grid point; if two rows land on
//! the same point the merge is retried as an exact join. Every failure is
//! returned as a value so the caller can fall back to gap filling.

use gapfix_core::config::RegularConfig;
use gapfix_core::{TimeSeriesFrame, TimestampMs};
use thiserror::Error;
use tracing::debug;

use crate::plan::{NumericFill, RowPlan, RowSource, WorkingSeries};

/// Why a grid could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("series has no timestamps")]
    EmptySeries,

    #[error("grid step must be positive, got {0}ms")]
    InvalidStep(i64),

    #[error("series ends before it starts ({start} > {end})")]
    InvalidSpan { start: TimestampMs, end: TimestampMs },

    #[error("grid would hold {projected} rows, limit is {limit}")]
    TooManyRows { projected: u128, limit: usize },
}

/// Why rows could not be placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("rows {first} and {second} both map to grid point {point}")]
    Collision {
        point: usize,
        first: usize,
        second: usize,
    },

    #[error("{count} rows do not sit exactly on a grid point")]
    Unmatched { count: usize },
}

/// Why regular reindexing gave up.
#[derive(Debug, Error)]
pub enum RegularError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("nearest merge failed ({nearest}); exact join failed ({exact})")]
    Merge { nearest: MergeError, exact: MergeError },

    #[error("output assembly failed: {0}")]
    Assembly(#[from] gapfix_core::Error),
}

/// Uniform timestamps `start + k * step` for `k` in `0..len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    start: TimestampMs,
    step: i64,
    len: usize,
}

impl Grid {
    /// Build the grid covering `[start, end]`, refusing more than `limit` rows.
    pub fn try_build(
        start: TimestampMs,
        end: TimestampMs,
        step: i64,
        limit: usize,
    ) -> Result<Self, GridError> {
        if step <= 0 {
            return Err(GridError::InvalidStep(step));
        }
        if end < start {
            return Err(GridError::InvalidSpan { start, end });
        }

        let projected = (end as i128 - start as i128) as u128 / step as u128 + 1;
        if projected > limit as u128 {
            return Err(GridError::TooManyRows { projected, limit });
        }

        Ok(Self {
            start,
            step,
            len: projected as usize,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn step_ms(&self) -> i64 {
        self.step
    }

    /// Timestamp of grid point `k`.
    #[inline]
    pub fn timestamp(&self, k: usize) -> TimestampMs {
        self.start + self.step * k as i64
    }

    /// Grid point closest to `t`, clamped to the grid. Halfway rounds up.
    fn nearest_point(&self, t: TimestampMs) -> usize {
        let offset = t as i128 - self.start as i128;
        let step = self.step as i128;
        let k = (offset + step / 2).div_euclid(step);
        k.clamp(0, self.len as i128 - 1) as usize
    }

    /// Grid point exactly at `t`, if any.
    fn exact_point(&self, t: TimestampMs) -> Option<usize> {
        let offset = t as i128 - self.start as i128;
        let step = self.step as i128;
        if offset < 0 || offset % step != 0 {
            return None;
        }
        let k = offset / step;
        (k < self.len as i128).then_some(k as usize)
    }

    /// Assign each row to its nearest grid point.
    ///
    /// Returns, per grid point, the row placed there.
    pub fn nearest_merge(&self, timestamps: &[TimestampMs]) -> Result<Vec<Option<usize>>, MergeError> {
        let mut slots = vec![None; self.len];
        for (row, &t) in timestamps.iter().enumerate() {
            let point = self.nearest_point(t);
            place(&mut slots, point, row)?;
        }
        Ok(slots)
    }

    /// Assign each row to the grid point it sits on exactly.
    pub fn exact_merge(&self, timestamps: &[TimestampMs]) -> Result<Vec<Option<usize>>, MergeError> {
        let mut slots = vec![None; self.len];
        let mut unmatched = 0;
        for (row, &t) in timestamps.iter().enumerate() {
            match self.exact_point(t) {
                Some(point) => place(&mut slots, point, row)?,
                None => unmatched += 1,
            }
        }
        if unmatched > 0 {
            return Err(MergeError::Unmatched { count: unmatched });
        }
        Ok(slots)
    }
}

fn place(slots: &mut [Option<usize>], point: usize, row: usize) -> Result<(), MergeError> {
    match slots[point] {
        Some(first) => Err(MergeError::Collision {
            point,
            first,
            second: row,
        }),
        None => {
            slots[point] = Some(row);
            Ok(())
        }
    }
}

/// Result of a successful reindex.
#[derive(Debug, Clone)]
pub struct Reindexed {
    pub frame: TimeSeriesFrame,
    pub grid_rows: usize,
    pub step_ms: i64,
    /// Whether the exact join was needed after a nearest-merge collision.
    ///
    /// Always false for a sorted series: see [`RegularReindexer::plan`].
    pub exact_join: bool,
    /// Grid points that had no row.
    pub inserted: usize,
}

/// Reindexes a series onto a uniform grid at its estimated step.
#[derive(Debug, Clone, Default)]
pub struct RegularReindexer {
    config: RegularConfig,
}

impl RegularReindexer {
    pub fn new(config: RegularConfig) -> Self {
        Self { config }
    }

    /// Plan the grid rows for `series` at `step_ms`.
    ///
    /// A nearest-merge collision is retried once as an exact join. The rows of
    /// a [`WorkingSeries`] are sorted, so a collision means two rows share a
    /// timestamp or a row sits off the grid, and the exact join then fails
    /// too. The retry only adds the exact join's error to
    /// [`RegularError::Merge`].
    pub fn plan(&self, series: &WorkingSeries, step_ms: i64) -> Result<(Grid, RowPlan, bool), RegularError> {
        let timestamps = series.timestamps();
        let (start, end) = match (timestamps.first(), timestamps.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(GridError::EmptySeries.into()),
        };
        let grid = Grid::try_build(start, end, step_ms, self.config.max_grid_rows)?;

        let (slots, exact_join) = match grid.nearest_merge(timestamps) {
            Ok(slots) => (slots, false),
            Err(nearest) => {
                debug!(error = %nearest, "nearest merge failed, retrying as exact join");
                match grid.exact_merge(timestamps) {
                    Ok(slots) => (slots, true),
                    Err(exact) => return Err(RegularError::Merge { nearest, exact }),
                }
            }
        };

        let mut plan = RowPlan::with_capacity(grid.len());
        for (k, slot) in slots.into_iter().enumerate() {
            let ts = grid.timestamp(k);
            let source = match slot {
                Some(row) => RowSource::Original(row),
                None => RowSource::Grid {
                    // The grid spans the series, which is never empty here.
                    nearest: series.nearest_row(ts).unwrap_or(0),
                },
            };
            plan.push(ts, source);
        }

        Ok((grid, plan, exact_join))
    }

    /// Reindex `series` and assemble the output frame.
    pub fn reindex(&self, series: &WorkingSeries, step_ms: i64) -> Result<Reindexed, RegularError> {
        let (grid, plan, exact_join) = self.plan(series, step_ms)?;
        let frame = plan.materialize(series, NumericFill::ByPosition)?;
        Ok(Reindexed {
            frame,
            grid_rows: grid.len(),
            step_ms: grid.step_ms(),
            exact_join,
            inserted: plan.inserted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapfix_core::{AxisRule, Column, ColumnData, TimeAxis};
    use gapfix_ingestion::ResolvedAxis;

    const HOUR: i64 = 3_600_000;

    fn series_from(ts: Vec<TimestampMs>, close: Vec<f64>) -> WorkingSeries {
        let frame = TimeSeriesFrame::new(vec![
            Column::timestamp("ts", ts.iter().map(|&t| Some(t)).collect()),
            Column::float("close", close.into_iter().map(Some).collect()),
        ])
        .unwrap();
        WorkingSeries::prepare(
            &frame,
            ResolvedAxis {
                axis: TimeAxis::Column("ts".into()),
                rule: AxisRule::TemporalType,
                timestamps: ts.into_iter().map(Some).collect(),
            },
        )
    }

    #[test]
    fn test_grid_bounds() {
        let grid = Grid::try_build(0, 10 * HOUR, HOUR, 100).unwrap();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid.timestamp(10), 10 * HOUR);

        // End not on a grid point: the grid stops at the last point <= end.
        let grid = Grid::try_build(0, 10 * HOUR + 5, HOUR, 100).unwrap();
        assert_eq!(grid.len(), 11);
    }

    #[test]
    fn test_grid_errors() {
        assert_eq!(Grid::try_build(0, 10, 0, 100), Err(GridError::InvalidStep(0)));
        assert!(matches!(
            Grid::try_build(10, 0, 1, 100),
            Err(GridError::InvalidSpan { .. })
        ));
        assert_eq!(
            Grid::try_build(0, 1_000, 1, 100),
            Err(GridError::TooManyRows {
                projected: 1_001,
                limit: 100
            })
        );
    }

    #[test]
    fn test_nearest_merge_snaps_jitter() {
        let grid = Grid::try_build(0, 4 * HOUR, HOUR, 100).unwrap();
        let slots = grid.nearest_merge(&[0, HOUR + 60_000, 4 * HOUR - 1]).unwrap();
        assert_eq!(slots, vec![Some(0), Some(1), None, None, Some(2)]);
    }

    #[test]
    fn test_nearest_collision_then_exact() {
        let grid = Grid::try_build(0, 2 * HOUR, HOUR, 100).unwrap();
        let ts = [0, HOUR, HOUR + 1, 2 * HOUR];
        assert!(matches!(
            grid.nearest_merge(&ts),
            Err(MergeError::Collision { point: 1, first: 1, second: 2 })
        ));
        assert_eq!(grid.exact_merge(&ts), Err(MergeError::Unmatched { count: 1 }));
    }

    #[test]
    fn test_reindex_fills_missing_hours() {
        let series = series_from(
            vec![0, HOUR, 4 * HOUR, 5 * HOUR],
            vec![1.0, 2.0, 5.0, 6.0],
        );
        let out = RegularReindexer::default().reindex(&series, HOUR).unwrap();
        assert_eq!(out.grid_rows, 6);
        assert_eq!(out.inserted, 2);
        assert!(!out.exact_join);
        assert_eq!(
            out.frame.column("close").unwrap().data,
            ColumnData::Float(vec![
                Some(1.0),
                Some(2.0),
                Some(3.0),
                Some(4.0),
                Some(5.0),
                Some(6.0)
            ])
        );
    }

    #[test]
    fn test_reindex_duplicate_timestamps_fail() {
        let series = series_from(vec![0, HOUR, HOUR, 2 * HOUR], vec![1.0; 4]);
        let err = RegularReindexer::default().reindex(&series, HOUR).unwrap_err();
        match err {
            RegularError::Merge { nearest, exact } => {
                assert!(matches!(nearest, MergeError::Collision { .. }));
                assert!(matches!(exact, MergeError::Collision { .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_reindex_jittered_collision_reports_both_joins() {
        let series = series_from(vec![0, HOUR, HOUR + 1, 2 * HOUR], vec![1.0; 4]);
        let err = RegularReindexer::default().plan(&series, HOUR).unwrap_err();
        assert!(err.to_string().contains("exact join failed"));
        match err {
            RegularError::Merge { nearest, exact } => {
                assert_eq!(
                    nearest,
                    MergeError::Collision {
                        point: 1,
                        first: 1,
                        second: 2
                    }
                );
                assert_eq!(exact, MergeError::Unmatched { count: 1 });
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_reindex_grid_cap() {
        let series = series_from(vec![0, 1_000], vec![1.0, 2.0]);
        let reindexer = RegularReindexer::new(RegularConfig { max_grid_rows: 10 });
        assert!(matches!(
            reindexer.reindex(&series, 1),
            Err(RegularError::Grid(GridError::TooManyRows { .. }))
        ));
    }
}
