//! Columnar in-memory time series frame.
//!
//! A frame is a set of equally long named columns plus a row index. Cells
//! are nullable; a `NaN` float is treated the same as a null cell.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::TimestampMs;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Float,
    Int,
    Bool,
    Text,
    Timestamp,
}

impl ColumnKind {
    /// Float and integer columns take part in interpolation.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Float | ColumnKind::Int)
    }
}

/// Typed, nullable column storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<TimestampMs>>),
}

impl ColumnData {
    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared type.
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Float(_) => ColumnKind::Float,
            ColumnData::Int(_) => ColumnKind::Int,
            ColumnData::Bool(_) => ColumnKind::Bool,
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Timestamp(_) => ColumnKind::Timestamp,
        }
    }

    /// Whether a cell is null (a `NaN` float counts as null).
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(v) => v[row].map_or(true, f64::is_nan),
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Bool(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
            ColumnData::Timestamp(v) => v[row].is_none(),
        }
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row)).count()
    }

    /// Numeric view of the column, `None` for non-numeric kinds.
    ///
    /// Integers are widened to `f64`; `NaN` becomes a null cell.
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Float(v) => Some(v.iter().map(|x| x.filter(|x| !x.is_nan())).collect()),
            ColumnData::Int(v) => Some(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            _ => None,
        }
    }

    /// Gather cells by row position. Every position must be in range.
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        self.gather(rows.iter().map(|&r| Some(r)))
    }

    /// Gather cells by optional row position; `None` yields a null cell.
    pub fn gather<I>(&self, rows: I) -> ColumnData
    where
        I: IntoIterator<Item = Option<usize>>,
    {
        fn pick<T: Clone>(values: &[Option<T>], rows: impl IntoIterator<Item = Option<usize>>) -> Vec<Option<T>> {
            rows.into_iter()
                .map(|row| row.and_then(|r| values[r].clone()))
                .collect()
        }

        match self {
            ColumnData::Float(v) => ColumnData::Float(pick(v, rows)),
            ColumnData::Int(v) => ColumnData::Int(pick(v, rows)),
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, rows)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, rows)),
            ColumnData::Timestamp(v) => ColumnData::Timestamp(pick(v, rows)),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name, unique within a frame.
    pub name: String,
    /// Cell storage.
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn int(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn timestamp(name: impl Into<String>, values: Vec<Option<TimestampMs>>) -> Self {
        Self::new(name, ColumnData::Timestamp(values))
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the column has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Declared type.
    #[inline]
    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }
}

/// Row index of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowIndex {
    /// Plain row positions; not temporal.
    Positional,
    /// One nullable timestamp per row.
    Temporal(Vec<Option<TimestampMs>>),
}

impl RowIndex {
    /// Whether the index carries timestamps.
    pub fn is_temporal(&self) -> bool {
        matches!(self, RowIndex::Temporal(_))
    }
}

/// Ordered, columnar time series.
///
/// Owned by the caller; the gap fixing engine only ever reads it and
/// returns a new frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesFrame {
    columns: Vec<Column>,
    index: RowIndex,
    rows: usize,
}

impl TimeSeriesFrame {
    /// Create a frame with a positional index.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        Self::with_index(columns, RowIndex::Positional)
    }

    /// Create a frame with an explicit index.
    ///
    /// All columns (and a temporal index) must have the same length and
    /// column names must be unique.
    pub fn with_index(columns: Vec<Column>, index: RowIndex) -> Result<Self> {
        let rows = match (&index, columns.first()) {
            (RowIndex::Temporal(ts), _) => ts.len(),
            (RowIndex::Positional, Some(col)) => col.len(),
            (RowIndex::Positional, None) => 0,
        };

        for (i, col) in columns.iter().enumerate() {
            if col.len() != rows {
                return Err(Error::schema(format!(
                    "column '{}' has {} rows, expected {}",
                    col.name,
                    col.len(),
                    rows
                )));
            }
            if columns[..i].iter().any(|other| other.name == col.name) {
                return Err(Error::schema(format!("duplicate column name '{}'", col.name)));
            }
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// A frame with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            index: RowIndex::Positional,
            rows: 0,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the frame has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All columns in schema order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The row index.
    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    /// Consume the frame into its columns and index.
    pub fn into_parts(self) -> (Vec<Column>, RowIndex) {
        (self.columns, self.index)
    }

    /// New frame holding the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> TimeSeriesFrame {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
            .collect();
        let index = match &self.index {
            RowIndex::Positional => RowIndex::Positional,
            RowIndex::Temporal(ts) => RowIndex::Temporal(rows.iter().map(|&r| ts[r]).collect()),
        };
        TimeSeriesFrame {
            columns,
            index,
            rows: rows.len(),
        }
    }

    /// New frame holding only the rows for which `keep` returns true.
    pub fn filter(&self, mut keep: impl FnMut(usize) -> bool) -> TimeSeriesFrame {
        let rows: Vec<usize> = (0..self.rows).filter(|&r| keep(r)).collect();
        self.take(&rows)
    }
}
