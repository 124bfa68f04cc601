//! Strategy selection from span and frequency validity.

use gapfix_core::config::StrategyConfig;
use gapfix_core::{days_to_ms, Frequency};
use serde::Serialize;
use std::fmt;

/// Regularization strategy for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Uniform grid at the estimated frequency.
    RegularReindex,
    /// Bounded insertion into statistically large gaps.
    IrregularFill,
    /// Bounded insertion tuned for multi-year spans.
    LargeRangeFill,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::RegularReindex => "regular_reindex",
            Strategy::IrregularFill => "irregular_fill",
            Strategy::LargeRangeFill => "large_range_fill",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks a strategy. Rules are checked in order, first match wins:
///
/// | Condition                         | Strategy         |
/// |-----------------------------------|------------------|
/// | frequency invalid                 | `IrregularFill`  |
/// | span > large range minimum        | `LargeRangeFill` |
/// | span > regular maximum            | `IrregularFill`  |
/// | otherwise                         | `RegularReindex` |
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Choose a strategy for a series spanning `span_ms`.
    pub fn select(&self, span_ms: i64, frequency: &Frequency) -> Strategy {
        if !frequency.is_valid() {
            Strategy::IrregularFill
        } else if span_ms > days_to_ms(self.config.large_range_min_span_days) {
            Strategy::LargeRangeFill
        } else if span_ms > days_to_ms(self.config.regular_max_span_days) {
            Strategy::IrregularFill
        } else {
            Strategy::RegularReindex
        }
    }
}
