//! Cleaned working series and the row plan that turns it into output.
//!
//! Both regularization paths describe their result as a [`RowPlan`]: one
//! entry per output row saying where that row comes from. Materializing a
//! plan is shared so numeric promotion, interpolation and axis write-back
//! behave the same on every path.

use gapfix_core::{
    Column, ColumnData, Result, RowIndex, TimeAxis, TimeSeriesFrame, TimestampMs,
};
use gapfix_ingestion::ResolvedAxis;

use crate::interpolate::{interpolate_by_position, interpolate_by_time, lerp, time_weight};

/// A frame with its resolved timestamps, nulls removed and sorted ascending.
#[derive(Debug, Clone)]
pub struct WorkingSeries {
    frame: TimeSeriesFrame,
    axis: TimeAxis,
    timestamps: Vec<TimestampMs>,
}

impl WorkingSeries {
    /// Drop rows with unresolvable timestamps and sort the rest.
    ///
    /// Sorting is stable, so rows sharing a timestamp keep their input order.
    pub fn prepare(frame: &TimeSeriesFrame, resolved: ResolvedAxis) -> Self {
        let mut rows: Vec<(usize, TimestampMs)> = resolved
            .timestamps
            .iter()
            .enumerate()
            .filter_map(|(row, ts)| ts.map(|ts| (row, ts)))
            .collect();
        rows.sort_by_key(|&(_, ts)| ts);

        let order: Vec<usize> = rows.iter().map(|&(row, _)| row).collect();
        Self {
            frame: frame.take(&order),
            axis: resolved.axis,
            timestamps: rows.into_iter().map(|(_, ts)| ts).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn frame(&self) -> &TimeSeriesFrame {
        &self.frame
    }

    /// Sorted timestamps, one per row.
    pub fn timestamps(&self) -> &[TimestampMs] {
        &self.timestamps
    }

    /// Last minus first timestamp, zero when empty.
    pub fn span_ms(&self) -> i64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last.saturating_sub(*first),
            _ => 0,
        }
    }

    /// Index of the row closest in time to `t`; ties go to the earlier row.
    pub fn nearest_row(&self, t: TimestampMs) -> Option<usize> {
        if self.timestamps.is_empty() {
            return None;
        }
        let after = self.timestamps.partition_point(|&ts| ts < t);
        if after == 0 {
            return Some(0);
        }
        if after == self.timestamps.len() {
            return Some(after - 1);
        }
        // Leftmost row of the run sharing the earlier timestamp.
        let before_ts = self.timestamps[after - 1];
        let before = self.timestamps.partition_point(|&ts| ts < before_ts);
        if t.saturating_sub(before_ts) <= self.timestamps[after].saturating_sub(t) {
            Some(before)
        } else {
            Some(after)
        }
    }
}

/// Where an output row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    /// A row of the working series, copied as is.
    Original(usize),
    /// Inserted inside a gap. Numeric cells are weighted by time between the
    /// boundary rows; other cells are carried from the left boundary.
    Synthetic { left: usize, right: usize },
    /// A grid point with no matching row. Numeric cells start null and are
    /// interpolated; other cells come from the nearest row.
    Grid { nearest: usize },
}

impl RowSource {
    fn carry_row(self) -> usize {
        match self {
            RowSource::Original(row) => row,
            RowSource::Synthetic { left, .. } => left,
            RowSource::Grid { nearest } => nearest,
        }
    }
}

/// How remaining interior numeric nulls are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFill {
    /// Linear by row position.
    ByPosition,
    /// Linear by elapsed time.
    ByTime,
}

/// Ordered output rows with their timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPlan {
    rows: Vec<(TimestampMs, RowSource)>,
}

impl RowPlan {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Every row of the series, unchanged.
    pub fn identity(series: &WorkingSeries) -> Self {
        Self {
            rows: series
                .timestamps()
                .iter()
                .enumerate()
                .map(|(row, &ts)| (ts, RowSource::Original(row)))
                .collect(),
        }
    }

    pub fn push(&mut self, ts: TimestampMs, source: RowSource) {
        self.rows.push((ts, source));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> Vec<TimestampMs> {
        self.rows.iter().map(|&(ts, _)| ts).collect()
    }

    /// Number of rows not copied from the series.
    pub fn inserted(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, source)| !matches!(source, RowSource::Original(_)))
            .count()
    }

    /// Stable sort by timestamp if the plan is out of order.
    pub fn ensure_sorted(&mut self) {
        if self.rows.windows(2).any(|w| w[0].0 > w[1].0) {
            self.rows.sort_by_key(|&(ts, _)| ts);
        }
    }

    /// Build the output frame.
    ///
    /// The axis column (or index) is rewritten with the plan timestamps as a
    /// timestamp column. Integer columns become float columns once any cell
    /// in them is synthesized.
    pub fn materialize(&self, series: &WorkingSeries, fill: NumericFill) -> Result<TimeSeriesFrame> {
        let timestamps = self.timestamps();
        let axis_column = match series.axis() {
            TimeAxis::Column(name) => Some(name.as_str()),
            TimeAxis::Index => None,
        };

        let columns = series
            .frame()
            .columns()
            .iter()
            .map(|column| {
                let data = if Some(column.name.as_str()) == axis_column {
                    ColumnData::Timestamp(timestamps.iter().map(|&ts| Some(ts)).collect())
                } else if let Some(values) = column.data.to_f64() {
                    self.numeric(&column.data, &values, series, &timestamps, fill)
                } else {
                    column
                        .data
                        .gather(self.rows.iter().map(|(_, source)| Some(source.carry_row())))
                };
                Column::new(column.name.clone(), data)
            })
            .collect();

        let index = match (series.axis(), series.frame().index()) {
            (TimeAxis::Index, _) => RowIndex::Temporal(timestamps.iter().map(|&ts| Some(ts)).collect()),
            (TimeAxis::Column(_), RowIndex::Temporal(values)) => RowIndex::Temporal(
                self.rows
                    .iter()
                    .map(|(_, source)| values[source.carry_row()])
                    .collect(),
            ),
            (TimeAxis::Column(_), RowIndex::Positional) => RowIndex::Positional,
        };

        TimeSeriesFrame::with_index(columns, index)
    }

    fn numeric(
        &self,
        original: &ColumnData,
        values: &[Option<f64>],
        series: &WorkingSeries,
        timestamps: &[TimestampMs],
        fill: NumericFill,
    ) -> ColumnData {
        let source_ts = series.timestamps();
        let mut out: Vec<Option<f64>> = self
            .rows
            .iter()
            .map(|&(ts, source)| match source {
                RowSource::Original(row) => values[row],
                RowSource::Synthetic { left, right } => match (values[left], values[right]) {
                    (Some(l), Some(r)) => Some(lerp(l, r, time_weight(ts, source_ts[left], source_ts[right]))),
                    _ => None,
                },
                RowSource::Grid { .. } => None,
            })
            .collect();

        let filled = match fill {
            NumericFill::ByPosition => interpolate_by_position(&mut out),
            NumericFill::ByTime => interpolate_by_time(&mut out, timestamps),
        };

        if let ColumnData::Int(_) = original {
            if filled == 0 && self.inserted() == 0 {
                let rows: Vec<usize> = self.rows.iter().map(|(_, source)| source.carry_row()).collect();
                return original.take(&rows);
            }
        }
        ColumnData::Float(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapfix_core::{AxisRule, ColumnKind};

    fn series(frame: &TimeSeriesFrame, column: &str) -> WorkingSeries {
        let timestamps = match &frame.column(column).unwrap().data {
            ColumnData::Timestamp(v) => v.clone(),
            _ => panic!("not a timestamp column"),
        };
        WorkingSeries::prepare(
            frame,
            ResolvedAxis {
                axis: TimeAxis::Column(column.to_string()),
                rule: AxisRule::TemporalType,
                timestamps,
            },
        )
    }

    fn sample() -> TimeSeriesFrame {
        TimeSeriesFrame::new(vec![
            Column::timestamp("ts", vec![Some(30), None, Some(10), Some(20)]),
            Column::int("qty", vec![Some(3), Some(9), Some(1), Some(2)]),
            Column::text("tag", vec![Some("c"), Some("x"), Some("a"), Some("b")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_prepare_drops_nulls_and_sorts() {
        let s = series(&sample(), "ts");
        assert_eq!(s.len(), 3);
        assert_eq!(s.timestamps(), &[10, 20, 30]);
        assert_eq!(s.span_ms(), 20);
        assert_eq!(
            s.frame().column("tag").unwrap().data,
            ColumnData::Text(vec![Some("a".into()), Some("b".into()), Some("c".into())])
        );
    }

    #[test]
    fn test_prepare_is_stable_for_duplicates() {
        let frame = TimeSeriesFrame::new(vec![
            Column::timestamp("ts", vec![Some(5), Some(1), Some(5)]),
            Column::int("n", vec![Some(0), Some(1), Some(2)]),
        ])
        .unwrap();
        let s = series(&frame, "ts");
        assert_eq!(
            s.frame().column("n").unwrap().data,
            ColumnData::Int(vec![Some(1), Some(0), Some(2)])
        );
    }

    #[test]
    fn test_nearest_row_tie_goes_earlier() {
        let s = series(&sample(), "ts");
        assert_eq!(s.nearest_row(0), Some(0));
        assert_eq!(s.nearest_row(15), Some(0));
        assert_eq!(s.nearest_row(16), Some(1));
        assert_eq!(s.nearest_row(99), Some(2));
    }

    #[test]
    fn test_identity_keeps_int_columns() {
        let s = series(&sample(), "ts");
        let out = RowPlan::identity(&s)
            .materialize(&s, NumericFill::ByTime)
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.column("qty").unwrap().kind(), ColumnKind::Int);
        assert_eq!(out.column("ts").unwrap().kind(), ColumnKind::Timestamp);
    }

    #[test]
    fn test_synthetic_rows_promote_and_carry() {
        let s = series(&sample(), "ts");
        let mut plan = RowPlan::with_capacity(4);
        plan.push(10, RowSource::Original(0));
        plan.push(15, RowSource::Synthetic { left: 0, right: 1 });
        plan.push(20, RowSource::Original(1));
        plan.push(30, RowSource::Original(2));
        assert_eq!(plan.inserted(), 1);

        let out = plan.materialize(&s, NumericFill::ByTime).unwrap();
        assert_eq!(
            out.column("qty").unwrap().data,
            ColumnData::Float(vec![Some(1.0), Some(1.5), Some(2.0), Some(3.0)])
        );
        assert_eq!(
            out.column("tag").unwrap().data,
            ColumnData::Text(vec![
                Some("a".into()),
                Some("a".into()),
                Some("b".into()),
                Some("c".into())
            ])
        );
        assert_eq!(
            out.column("ts").unwrap().data,
            ColumnData::Timestamp(vec![Some(10), Some(15), Some(20), Some(30)])
        );
    }

    #[test]
    fn test_grid_rows_interpolated_by_position() {
        let s = series(&sample(), "ts");
        let mut plan = RowPlan::default();
        plan.push(10, RowSource::Original(0));
        plan.push(20, RowSource::Grid { nearest: 1 });
        plan.push(30, RowSource::Original(2));

        let out = plan.materialize(&s, NumericFill::ByPosition).unwrap();
        assert_eq!(
            out.column("qty").unwrap().data,
            ColumnData::Float(vec![Some(1.0), Some(2.0), Some(3.0)])
        );
        assert_eq!(
            out.column("tag").unwrap().data,
            ColumnData::Text(vec![Some("a".into()), Some("b".into()), Some("c".into())])
        );
    }

    #[test]
    fn test_index_axis_written_back() {
        let frame = TimeSeriesFrame::with_index(
            vec![Column::float("v", vec![Some(2.0), Some(1.0)])],
            RowIndex::Temporal(vec![Some(200), Some(100)]),
        )
        .unwrap();
        let s = WorkingSeries::prepare(
            &frame,
            ResolvedAxis {
                axis: TimeAxis::Index,
                rule: AxisRule::TemporalIndex,
                timestamps: vec![Some(200), Some(100)],
            },
        );
        let out = RowPlan::identity(&s).materialize(&s, NumericFill::ByTime).unwrap();
        assert_eq!(out.index(), &RowIndex::Temporal(vec![Some(100), Some(200)]));
        assert_eq!(
            out.column("v").unwrap().data,
            ColumnData::Float(vec![Some(1.0), Some(2.0)])
        );
    }

    #[test]
    fn test_ensure_sorted() {
        let mut plan = RowPlan::default();
        plan.push(20, RowSource::Original(1));
        plan.push(10, RowSource::Original(0));
        plan.ensure_sorted();
        assert_eq!(plan.timestamps(), vec![10, 20]);
    }
}
