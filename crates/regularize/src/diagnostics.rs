//! Diagnostics emitted while fixing gaps.
//!
//! The engine never writes to a global logger directly. Every notable
//! decision is described as a [`GapFixEvent`] and handed to a
//! [`DiagnosticSink`]; [`TracingSink`] forwards to `tracing`, while
//! [`CollectingSink`] keeps the events in memory for inspection.

use gapfix_core::{format_ts, AxisRule, Frequency, TimeAxis};
use gapfix_features::{GapPolicy, Strategy};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Info,
    Warning,
}

/// Something the engine decided or observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GapFixEvent {
    /// The input frame had no rows.
    EmptyFrame,
    /// A time axis was located.
    AxisResolved { axis: TimeAxis, rule: AxisRule },
    /// No rule located a time axis.
    AxisUnresolved { columns: usize },
    /// Rows whose timestamp could not be resolved were removed.
    NullTimestampsDropped { dropped: usize, remaining: usize },
    /// Every row had an unresolvable timestamp.
    AllRowsUnresolvable { rows: usize },
    /// Fewer than two timestamps, so no deltas exist.
    NoTimeDifferences { rows: usize },
    /// Dominant frequency of the cleaned series.
    FrequencyEstimated { frequency: Frequency },
    /// Strategy chosen from span and frequency.
    StrategySelected {
        strategy: Strategy,
        span_ms: i64,
        start_ms: i64,
        end_ms: i64,
    },
    /// A strategy could not complete and another one took over.
    FallbackTaken {
        from: Strategy,
        to: Strategy,
        reason: String,
    },
    /// Series reindexed onto a uniform grid.
    GridReindexed {
        grid_rows: usize,
        step_ms: i64,
        exact_join: bool,
    },
    /// Synthetic rows inserted into detected gaps.
    GapsFilled {
        policy: GapPolicy,
        gaps: usize,
        rows_inserted: usize,
        threshold_ms: f64,
    },
    /// Row counts around the whole operation.
    RowCounts { before: usize, after: usize },
    /// The output frame could not be assembled.
    AssemblyFailed { reason: String },
}

impl fmt::Display for GapFixEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapFixEvent::EmptyFrame => write!(f, "input frame is empty"),
            GapFixEvent::AxisResolved { axis, rule } => {
                write!(f, "time axis is {} (rule {})", axis, rule.as_str())
            }
            GapFixEvent::AxisUnresolved { columns } => {
                write!(f, "no time axis found among {} columns", columns)
            }
            GapFixEvent::NullTimestampsDropped { dropped, remaining } => write!(
                f,
                "dropped {} rows with unresolvable timestamps, {} remain",
                dropped, remaining
            ),
            GapFixEvent::AllRowsUnresolvable { rows } => {
                write!(f, "all {} rows have unresolvable timestamps", rows)
            }
            GapFixEvent::NoTimeDifferences { rows } => {
                write!(f, "{} row(s) give no time differences", rows)
            }
            GapFixEvent::FrequencyEstimated { frequency } => {
                write!(f, "estimated frequency {}", frequency)
            }
            GapFixEvent::StrategySelected {
                strategy,
                span_ms,
                start_ms,
                end_ms,
            } => write!(
                f,
                "strategy {} for span {}ms ({} to {})",
                strategy,
                span_ms,
                format_ts(*start_ms),
                format_ts(*end_ms)
            ),
            GapFixEvent::FallbackTaken { from, to, reason } => {
                write!(f, "{} fell back to {}: {}", from, to, reason)
            }
            GapFixEvent::GridReindexed {
                grid_rows,
                step_ms,
                exact_join,
            } => write!(
                f,
                "reindexed onto {} grid rows at {}ms ({} merge)",
                grid_rows,
                step_ms,
                if *exact_join { "exact" } else { "nearest" }
            ),
            GapFixEvent::GapsFilled {
                policy,
                gaps,
                rows_inserted,
                threshold_ms,
            } => write!(
                f,
                "{} fill inserted {} rows into {} gaps (threshold {:.0}ms)",
                policy.as_str(),
                rows_inserted,
                gaps,
                threshold_ms
            ),
            GapFixEvent::RowCounts { before, after } => {
                write!(f, "rows before {}, after {}", before, after)
            }
            GapFixEvent::AssemblyFailed { reason } => {
                write!(f, "could not assemble output frame: {}", reason)
            }
        }
    }
}

/// An event with its severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub event: GapFixEvent,
}

impl Diagnostic {
    pub fn info(event: GapFixEvent) -> Self {
        Self {
            level: Level::Info,
            event,
        }
    }

    pub fn warning(event: GapFixEvent) -> Self {
        Self {
            level: Level::Warning,
            event,
        }
    }
}

/// Receiver for engine diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at info or warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            Level::Info => info!(event = ?diagnostic.event, "{}", diagnostic.event),
            Level::Warning => warn!(event = ?diagnostic.event, "{}", diagnostic.event),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Events only, in emission order.
    pub fn events(&self) -> impl Iterator<Item = &GapFixEvent> {
        self.diagnostics.iter().map(|d| &d.event)
    }

    /// Warning-level diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == Level::Warning)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let mut sink = CollectingSink::new();
        sink.emit(Diagnostic::info(GapFixEvent::EmptyFrame));
        sink.emit(Diagnostic::warning(GapFixEvent::AxisUnresolved { columns: 3 }));

        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.events().next(), Some(&GapFixEvent::EmptyFrame));
        let warnings: Vec<_> = sink.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event, GapFixEvent::AxisUnresolved { columns: 3 });
    }

    #[test]
    fn test_event_messages() {
        let event = GapFixEvent::FallbackTaken {
            from: Strategy::RegularReindex,
            to: Strategy::IrregularFill,
            reason: "grid too large".into(),
        };
        assert_eq!(
            event.to_string(),
            "regular_reindex fell back to irregular_fill: grid too large"
        );

        let event = GapFixEvent::AxisResolved {
            axis: TimeAxis::Column("ts".into()),
            rule: AxisRule::TemporalType,
        };
        assert!(event.to_string().contains("column 'ts'"));
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let mut sink = TracingSink;
        sink.emit(Diagnostic::info(GapFixEvent::RowCounts { before: 1, after: 2 }));
        sink.emit(Diagnostic::warning(GapFixEvent::EmptyFrame));
    }
}
