//! Configuration structures for gap fixing.
//!
//! Every threshold and cap the engine uses lives here so callers can tune
//! them from JSON without touching the algorithms.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for the gap fixing engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFixConfig {
    /// Time axis resolution configuration.
    pub axis: AxisConfig,
    /// Strategy selection configuration.
    pub strategy: StrategyConfig,
    /// Regular grid reindexing configuration.
    pub regular: RegularConfig,
    /// Irregular gap filling configuration.
    pub irregular: IrregularConfig,
    /// Large range (multi-year) gap filling configuration.
    pub conservative: ConservativeConfig,
}

impl GapFixConfig {
    /// Parse a configuration from JSON and validate it.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GapFixConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.axis.validate()?;
        self.strategy.validate()?;

        if self.regular.max_grid_rows == 0 {
            return Err(Error::config("regular.max_grid_rows must be positive"));
        }

        let irr = &self.irregular;
        if irr.sigma_multiplier.is_nan() || irr.sigma_multiplier < 0.0 {
            return Err(Error::config("irregular.sigma_multiplier must be non-negative"));
        }
        if irr.max_rows_per_gap == 0 || irr.min_rows_per_gap > irr.max_rows_per_gap {
            return Err(Error::config(format!(
                "irregular rows per gap must satisfy 0 < min ({}) <= max ({})",
                irr.min_rows_per_gap, irr.max_rows_per_gap
            )));
        }

        let cons = &self.conservative;
        if cons.median_multiplier.is_nan() || cons.median_multiplier < 0.0 {
            return Err(Error::config("conservative.median_multiplier must be non-negative"));
        }
        if cons.row_chunk_days <= 0 {
            return Err(Error::config("conservative.row_chunk_days must be positive"));
        }
        if cons.max_rows_per_gap == 0 || cons.min_rows_per_gap > cons.max_rows_per_gap {
            return Err(Error::config(format!(
                "conservative rows per gap must satisfy 0 < min ({}) <= max ({})",
                cons.min_rows_per_gap, cons.max_rows_per_gap
            )));
        }
        if cons.moderate_max_rows_per_gap == 0 {
            return Err(Error::config("conservative.moderate_max_rows_per_gap must be positive"));
        }

        Ok(())
    }
}

/// Time axis resolution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Column names treated as temporal (case-insensitive substring match).
    pub temporal_names: Vec<String>,
    /// A numeric column whose mean exceeds this is considered for epoch parsing.
    pub epoch_mean_threshold: f64,
    /// Earliest calendar year accepted for an epoch interpretation.
    pub epoch_min_year: i32,
    /// Latest calendar year accepted for an epoch interpretation.
    pub epoch_max_year: i32,
    /// Largest share of non-null cells that may fail to parse before a
    /// column parse attempt counts as failed.
    pub max_unparseable_fraction: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            temporal_names: [
                "date",
                "time",
                "datetime",
                "timestamp",
                "time_open",
                "date_time",
                "day",
                "time_close",
                "timeopen",
                "timeclose",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            epoch_mean_threshold: 1_000_000.0,
            epoch_min_year: 1990,
            epoch_max_year: 2050,
            max_unparseable_fraction: 0.5,
        }
    }
}

impl AxisConfig {
    fn validate(&self) -> Result<()> {
        if self.epoch_min_year > self.epoch_max_year {
            return Err(Error::config(format!(
                "axis epoch year range is empty: [{}, {}]",
                self.epoch_min_year, self.epoch_max_year
            )));
        }
        if !(0.0..=1.0).contains(&self.max_unparseable_fraction) {
            return Err(Error::config("axis.max_unparseable_fraction must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Strategy selection configuration (span boundaries in days).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Spans up to this many days may use the regular grid.
    pub regular_max_span_days: i64,
    /// Spans above this many days use the conservative large range filler.
    pub large_range_min_span_days: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            regular_max_span_days: 30,
            large_range_min_span_days: 3650,
        }
    }
}

impl StrategyConfig {
    fn validate(&self) -> Result<()> {
        if self.regular_max_span_days <= 0 {
            return Err(Error::config("strategy.regular_max_span_days must be positive"));
        }
        if self.large_range_min_span_days <= self.regular_max_span_days {
            return Err(Error::config(format!(
                "strategy.large_range_min_span_days ({}) must exceed regular_max_span_days ({})",
                self.large_range_min_span_days, self.regular_max_span_days
            )));
        }
        Ok(())
    }
}

/// Regular grid reindexing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularConfig {
    /// Maximum projected grid length before falling back.
    pub max_grid_rows: usize,
}

impl Default for RegularConfig {
    fn default() -> Self {
        Self {
            max_grid_rows: 1_000_000,
        }
    }
}

/// Irregular gap filling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrregularConfig {
    /// Gap threshold is `mean + sigma_multiplier * std` of the deltas.
    pub sigma_multiplier: f64,
    /// Minimum synthetic rows inserted per gap.
    pub min_rows_per_gap: usize,
    /// Maximum synthetic rows inserted per gap.
    pub max_rows_per_gap: usize,
}

impl Default for IrregularConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: 2.0,
            min_rows_per_gap: 2,
            max_rows_per_gap: 1000,
        }
    }
}

/// Large range gap filling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConservativeConfig {
    /// Gap threshold is `median_multiplier * median` of the deltas.
    pub median_multiplier: f64,
    /// One synthetic row per this many days of gap.
    pub row_chunk_days: i64,
    /// Minimum synthetic rows per gap on multi-year spans.
    pub min_rows_per_gap: usize,
    /// Maximum synthetic rows per gap on multi-year spans.
    pub max_rows_per_gap: usize,
    /// Maximum synthetic rows per gap when the span is not multi-year.
    pub moderate_max_rows_per_gap: usize,
}

impl Default for ConservativeConfig {
    fn default() -> Self {
        Self {
            median_multiplier: 5.0,
            row_chunk_days: 30,
            min_rows_per_gap: 1,
            max_rows_per_gap: 10,
            moderate_max_rows_per_gap: 100,
        }
    }
}
