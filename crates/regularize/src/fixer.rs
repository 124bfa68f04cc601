//! Gap fixing pipeline.
//!
//! A run moves through fixed stages:
//!
//! ```text
//! Start -> AxisResolved -> Cleaned -> Sorted -> FrequencyComputed
//!       -> StrategyChosen -> Filled -> Done
//! ```
//!
//! Any stage may end the run early in `Unchanged`, in which case the input
//! frame is returned as is. Every decision is reported to a
//! [`DiagnosticSink`] and summarized in a [`GapFixReport`].

use gapfix_core::config::GapFixConfig;
use gapfix_core::{AxisRule, Frequency, GapSummary, Result, TimeAxis, TimeSeriesFrame};
use gapfix_features::{consecutive_deltas, DeltaStats, FrequencyEstimator, Strategy, StrategySelector};
use gapfix_ingestion::{AxisHints, TimeAxisResolver};
use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink, GapFixEvent, TracingSink};
use crate::irregular::GapFiller;
use crate::plan::WorkingSeries;
use crate::regular::RegularReindexer;

/// Caller options for a single run.
#[derive(Debug, Clone, Default)]
pub struct GapFixOptions {
    /// Column holding the timestamps, checked before any heuristic.
    pub time_column: Option<String>,
    /// Summary of a previous analysis; its time column is used as a hint.
    pub summary: Option<GapSummary>,
    /// Preferred layout for text timestamps (chrono `strftime` syntax).
    pub date_format: Option<String>,
}

impl GapFixOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = Some(name.into());
        self
    }

    pub fn with_summary(mut self, summary: GapSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    fn hints(&self) -> AxisHints<'_> {
        AxisHints {
            time_column: self.time_column.as_deref(),
            summary: self.summary.as_ref(),
            date_format: self.date_format.as_deref(),
        }
    }
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Start,
    AxisResolved,
    Cleaned,
    Sorted,
    FrequencyComputed,
    StrategyChosen,
    Filled,
    Done,
    Unchanged,
}

/// Why a run returned its input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnchangedReason {
    EmptyFrame,
    AxisUnresolved,
    AllRowsUnresolvable,
    NoTimeDifferences,
    AssemblyFailed,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Terminal {
    Done,
    Unchanged(UnchangedReason),
}

/// A strategy that could not complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fallback {
    pub from: Strategy,
    pub to: Strategy,
    pub reason: String,
}

/// What a run decided and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapFixReport {
    pub axis: Option<TimeAxis>,
    pub rule: Option<AxisRule>,
    /// Rows removed because their timestamp was unresolvable.
    pub dropped_rows: usize,
    pub frequency: Option<Frequency>,
    /// Strategy picked from span and frequency.
    pub selected: Option<Strategy>,
    /// Strategy that produced the output, after any fallback.
    pub applied: Option<Strategy>,
    pub fallbacks: Vec<Fallback>,
    pub gaps_filled: usize,
    pub rows_inserted: usize,
    pub rows_before: usize,
    pub rows_after: usize,
    pub terminal: Terminal,
}

impl GapFixReport {
    fn new(rows_before: usize) -> Self {
        Self {
            axis: None,
            rule: None,
            dropped_rows: 0,
            frequency: None,
            selected: None,
            applied: None,
            fallbacks: Vec::new(),
            gaps_filled: 0,
            rows_inserted: 0,
            rows_before,
            rows_after: rows_before,
            terminal: Terminal::Unchanged(UnchangedReason::EmptyFrame),
        }
    }

    /// Whether the output differs from the input frame.
    pub fn is_done(&self) -> bool {
        self.terminal == Terminal::Done
    }
}

/// Output frame and report of a run.
#[derive(Debug, Clone)]
pub struct GapFixOutcome {
    pub frame: TimeSeriesFrame,
    pub report: GapFixReport,
}

/// Detects gaps in a time series and regularizes it.
///
/// # Example
///
/// ```
/// use gapfix_core::{Column, TimeSeriesFrame};
/// use gapfix_regularize::{GapFixOptions, GapFixer};
///
/// const HOUR: i64 = 3_600_000;
/// let ts = vec![Some(0), Some(HOUR), Some(3 * HOUR)];
/// let frame = TimeSeriesFrame::new(vec![
///     Column::timestamp("ts", ts),
///     Column::float("close", vec![Some(1.0), Some(2.0), Some(4.0)]),
/// ])
/// .unwrap();
///
/// let outcome = GapFixer::default().run(&frame, &GapFixOptions::new());
/// assert_eq!(outcome.frame.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct GapFixer {
    config: GapFixConfig,
    resolver: TimeAxisResolver,
    selector: StrategySelector,
    regular: RegularReindexer,
    irregular: GapFiller,
    large_range: GapFiller,
}

impl Default for GapFixer {
    fn default() -> Self {
        Self::build(GapFixConfig::default())
    }
}

impl GapFixer {
    /// Create a fixer after validating `config`.
    pub fn new(config: GapFixConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GapFixConfig) -> Self {
        Self {
            resolver: TimeAxisResolver::new(config.axis.clone()),
            selector: StrategySelector::new(config.strategy.clone()),
            regular: RegularReindexer::new(config.regular.clone()),
            irregular: GapFiller::irregular(config.clone()),
            large_range: GapFiller::large_range(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &GapFixConfig {
        &self.config
    }

    /// Run with diagnostics sent to `tracing`.
    pub fn run(&self, frame: &TimeSeriesFrame, options: &GapFixOptions) -> GapFixOutcome {
        self.run_with_sink(frame, options, &mut TracingSink)
    }

    /// Run with diagnostics sent to `sink`.
    pub fn run_with_sink(
        &self,
        frame: &TimeSeriesFrame,
        options: &GapFixOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> GapFixOutcome {
        let mut run = Run::new(sink, frame.len());

        if frame.is_empty() {
            run.info(GapFixEvent::EmptyFrame);
            return run.unchanged(frame, UnchangedReason::EmptyFrame);
        }

        let Some(resolved) = self.resolver.resolve(frame, &options.hints()) else {
            run.warn(GapFixEvent::AxisUnresolved {
                columns: frame.columns().len(),
            });
            return run.unchanged(frame, UnchangedReason::AxisUnresolved);
        };
        run.report.axis = Some(resolved.axis.clone());
        run.report.rule = Some(resolved.rule);
        run.info(GapFixEvent::AxisResolved {
            axis: resolved.axis.clone(),
            rule: resolved.rule,
        });
        run.advance(Stage::AxisResolved);

        let dropped = resolved.null_count();
        if dropped == frame.len() {
            run.warn(GapFixEvent::AllRowsUnresolvable { rows: dropped });
            return run.unchanged(frame, UnchangedReason::AllRowsUnresolvable);
        }
        if dropped > 0 {
            run.warn(GapFixEvent::NullTimestampsDropped {
                dropped,
                remaining: frame.len() - dropped,
            });
        }
        run.report.dropped_rows = dropped;
        run.advance(Stage::Cleaned);

        let series = WorkingSeries::prepare(frame, resolved);
        run.advance(Stage::Sorted);

        let Some(stats) = DeltaStats::from_deltas(&consecutive_deltas(series.timestamps())) else {
            run.warn(GapFixEvent::NoTimeDifferences { rows: series.len() });
            return run.unchanged(frame, UnchangedReason::NoTimeDifferences);
        };
        let frequency = FrequencyEstimator.from_stats(&stats);
        run.report.frequency = Some(frequency);
        run.info(GapFixEvent::FrequencyEstimated { frequency });
        run.advance(Stage::FrequencyComputed);

        let strategy = self.selector.select(series.span_ms(), &frequency);
        let timestamps = series.timestamps();
        run.report.selected = Some(strategy);
        run.info(GapFixEvent::StrategySelected {
            strategy,
            span_ms: series.span_ms(),
            start_ms: timestamps.first().copied().unwrap_or_default(),
            end_ms: timestamps.last().copied().unwrap_or_default(),
        });
        run.advance(Stage::StrategyChosen);

        match self.apply(strategy, frequency, &series, &mut run) {
            Ok(output) => {
                run.advance(Stage::Filled);
                run.done(output)
            }
            Err(err) => {
                run.warn(GapFixEvent::AssemblyFailed {
                    reason: err.to_string(),
                });
                run.unchanged(frame, UnchangedReason::AssemblyFailed)
            }
        }
    }

    fn apply(
        &self,
        strategy: Strategy,
        frequency: Frequency,
        series: &WorkingSeries,
        run: &mut Run<'_>,
    ) -> Result<TimeSeriesFrame> {
        let (filler, applied) = match strategy {
            Strategy::RegularReindex => {
                let step_ms = frequency.step_ms().unwrap_or_default();
                match self.regular.reindex(series, step_ms) {
                    Ok(reindexed) => {
                        run.report.applied = Some(Strategy::RegularReindex);
                        run.report.rows_inserted = reindexed.inserted;
                        run.info(GapFixEvent::GridReindexed {
                            grid_rows: reindexed.grid_rows,
                            step_ms: reindexed.step_ms,
                            exact_join: reindexed.exact_join,
                        });
                        return Ok(reindexed.frame);
                    }
                    Err(err) => {
                        run.fallback(Strategy::RegularReindex, Strategy::IrregularFill, err.to_string());
                        (&self.irregular, Strategy::IrregularFill)
                    }
                }
            }
            Strategy::IrregularFill => (&self.irregular, Strategy::IrregularFill),
            Strategy::LargeRangeFill => (&self.large_range, Strategy::LargeRangeFill),
        };

        let filled = filler.fill(series)?;
        run.report.applied = Some(applied);
        run.report.gaps_filled = filled.gaps;
        run.report.rows_inserted = filled.inserted;
        run.info(GapFixEvent::GapsFilled {
            policy: filled.policy,
            gaps: filled.gaps,
            rows_inserted: filled.inserted,
            threshold_ms: filled.threshold_ms,
        });
        Ok(filled.frame)
    }
}

/// Mutable state of one run.
struct Run<'a> {
    sink: &'a mut dyn DiagnosticSink,
    report: GapFixReport,
    stage: Stage,
}

impl<'a> Run<'a> {
    fn new(sink: &'a mut dyn DiagnosticSink, rows_before: usize) -> Self {
        Self {
            sink,
            report: GapFixReport::new(rows_before),
            stage: Stage::Start,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = ?self.stage, to = ?next, "stage transition");
        self.stage = next;
    }

    fn info(&mut self, event: GapFixEvent) {
        self.sink.emit(Diagnostic::info(event));
    }

    fn warn(&mut self, event: GapFixEvent) {
        self.sink.emit(Diagnostic::warning(event));
    }

    fn fallback(&mut self, from: Strategy, to: Strategy, reason: String) {
        self.warn(GapFixEvent::FallbackTaken {
            from,
            to,
            reason: reason.clone(),
        });
        self.report.fallbacks.push(Fallback { from, to, reason });
    }

    fn finish(mut self, frame: TimeSeriesFrame, stage: Stage, terminal: Terminal) -> GapFixOutcome {
        self.advance(stage);
        self.report.terminal = terminal;
        self.report.rows_after = frame.len();
        self.info(GapFixEvent::RowCounts {
            before: self.report.rows_before,
            after: self.report.rows_after,
        });
        GapFixOutcome {
            frame,
            report: self.report,
        }
    }

    fn unchanged(self, input: &TimeSeriesFrame, reason: UnchangedReason) -> GapFixOutcome {
        self.finish(input.clone(), Stage::Unchanged, Terminal::Unchanged(reason))
    }

    fn done(self, output: TimeSeriesFrame) -> GapFixOutcome {
        self.finish(output, Stage::Done, Terminal::Done)
    }
}

/// Regularize `frame` with the default configuration.
///
/// Never fails: when no time axis can be found, or the series is too short
/// to have any time differences, the input is returned unchanged.
pub fn fix_gaps(frame: &TimeSeriesFrame, options: &GapFixOptions) -> TimeSeriesFrame {
    GapFixer::default().run(frame, options).frame
}
