//! Timestamp parsing for text and epoch-encoded columns.
//!
//! Column parsing is coercing: cells that fail to parse become null and are
//! dropped later as unresolvable rows. A whole-column attempt only counts as
//! successful when enough cells parse, see [`parse_column`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use gapfix_core::config::AxisConfig;
use gapfix_core::{representable, year_of, ColumnData, Error, Result, TimestampMs, SECOND_MS};

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%b-%Y",  // 15-Jan-2024
    "%d %b %Y",  // 15 Jan 2024
    "%b %d, %Y", // Jan 15, 2024
];

/// Unit of an epoch-encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
}

impl EpochUnit {
    fn to_ms(self, value: f64) -> Option<TimestampMs> {
        if !value.is_finite() {
            return None;
        }
        let ms = match self {
            EpochUnit::Seconds => value * SECOND_MS as f64,
            EpochUnit::Millis => value,
        }
        .round();
        if ms.abs() >= i64::MAX as f64 {
            return None;
        }
        let ms = ms as i64;
        DateTime::from_timestamp_millis(ms).map(|_| ms)
    }
}

fn naive_to_ms(dt: NaiveDateTime) -> TimestampMs {
    dt.and_utc().timestamp_millis()
}

fn date_to_ms(d: NaiveDate) -> Option<TimestampMs> {
    d.and_hms_opt(0, 0, 0).map(naive_to_ms)
}

/// Parse a single timestamp string.
///
/// Tries the caller's format first, then RFC 3339, then a list of common
/// datetime and date-only layouts. A trailing `Z` is accepted on the
/// datetime layouts.
pub fn parse_timestamp_str(s: &str, format: Option<&str>) -> Result<TimestampMs> {
    let s = s.trim();

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive_to_ms(dt));
        }
        if let Some(ms) = NaiveDate::parse_from_str(s, fmt).ok().and_then(date_to_ms) {
            return Ok(ms);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in &DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(naive_to_ms(dt));
        }
    }

    for fmt in &DATE_FORMATS {
        if let Some(ms) = NaiveDate::parse_from_str(s, fmt).ok().and_then(date_to_ms) {
            return Ok(ms);
        }
    }

    Err(Error::parse(format!("could not parse timestamp: '{}'", s)))
}

/// Interpret numeric values as epoch timestamps.
///
/// Seconds are tried before milliseconds. An interpretation is accepted
/// only when the earliest and latest values both land inside the configured
/// year range.
pub fn parse_epoch_values(
    values: &[Option<f64>],
    config: &AxisConfig,
) -> Option<(Vec<Option<TimestampMs>>, EpochUnit)> {
    [EpochUnit::Seconds, EpochUnit::Millis]
        .into_iter()
        .find_map(|unit| {
            let parsed: Vec<Option<TimestampMs>> = values
                .iter()
                .map(|v| v.and_then(|v| unit.to_ms(v)))
                .collect();
            epoch_in_range(&parsed, config).then_some((parsed, unit))
        })
}

fn epoch_in_range(parsed: &[Option<TimestampMs>], config: &AxisConfig) -> bool {
    let mut present = parsed.iter().flatten().copied();
    let Some(first) = present.next() else {
        return false;
    };
    let (min, max) = present.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    let years = config.epoch_min_year..=config.epoch_max_year;
    matches!((year_of(min), year_of(max)), (Some(lo), Some(hi)) if years.contains(&lo) && years.contains(&hi))
}

/// Outcome of parsing a whole column as timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedColumn {
    /// One timestamp per row; null where the cell was null or unparseable.
    pub values: Vec<Option<TimestampMs>>,
    /// Non-null cells that failed to parse.
    pub unparseable: usize,
}

/// Parse a column of any type as timestamps.
///
/// - `Timestamp` columns are taken as they are.
/// - `Text` columns are parsed cell by cell and accepted when at least one
///   cell parses and the unparseable share stays within
///   `max_unparseable_fraction`.
/// - `Float`/`Int` columns go through the epoch interpretation.
/// - `Bool` columns never parse.
pub fn parse_column(
    data: &ColumnData,
    config: &AxisConfig,
    date_format: Option<&str>,
) -> Option<ParsedColumn> {
    match data {
        ColumnData::Timestamp(values) => Some(ParsedColumn {
            values: representable(values),
            unparseable: 0,
        }),
        ColumnData::Text(cells) => {
            let mut unparseable = 0usize;
            let mut non_null = 0usize;
            let values: Vec<Option<TimestampMs>> = cells
                .iter()
                .map(|cell| {
                    let cell = cell.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
                    non_null += 1;
                    let parsed = parse_timestamp_str(cell, date_format).ok();
                    if parsed.is_none() {
                        unparseable += 1;
                    }
                    parsed
                })
                .collect();

            let parsed = non_null - unparseable;
            let allowed = config.max_unparseable_fraction * non_null as f64;
            (parsed > 0 && unparseable as f64 <= allowed).then_some(ParsedColumn {
                values,
                unparseable,
            })
        }
        ColumnData::Float(_) | ColumnData::Int(_) => {
            let numeric = data.to_f64()?;
            let (values, _unit) = parse_epoch_values(&numeric, config)?;
            Some(ParsedColumn {
                values,
                unparseable: 0,
            })
        }
        ColumnData::Bool(_) => None,
    }
}
