//! Core statistical operations and traits
//!
//! This module defines the statistics that can be taken over a region's cells
//! and the accumulator that collects them.

use super::rasterize::Coverage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Supported zonal statistics
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ZonalStatistic {
    /// Arithmetic mean
    #[default]
    Mean,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Sum of values
    Sum,
    /// Number of valid cells
    Count,
}

impl ZonalStatistic {
    /// Get the string representation of the statistic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Count => "count",
        }
    }
}

/// Running totals over the valid cells of a region
#[derive(Debug, Clone, Copy)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add a cell value unless it is non-finite or equal to `nodata`
    pub fn push(&mut self, value: f64, nodata: Option<f64>) {
        if !value.is_finite() || is_nodata(value, nodata) {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Final value of a statistic; `None` when no valid cell was seen
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self, statistic: ZonalStatistic) -> Option<f64> {
        match statistic {
            ZonalStatistic::Count => Some(self.count as f64),
            _ if self.count == 0 => None,
            ZonalStatistic::Mean => Some(self.sum / self.count as f64),
            ZonalStatistic::Min => Some(self.min),
            ZonalStatistic::Max => Some(self.max),
            ZonalStatistic::Sum => Some(self.sum),
        }
    }
}

/// Whether a cell equals the no-data sentinel.
///
/// Cells that are exact f32 values (read from a Float32 band) also match in f32
/// precision, so a sentinel such as `-3.4028235e38` still matches them.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    match nodata {
        Some(sentinel) if sentinel.is_nan() => value.is_nan(),
        Some(sentinel) => {
            let narrow = value as f32;
            value == sentinel || (f64::from(narrow) == value && narrow == sentinel as f32)
        }
        None => false,
    }
}

/// Compute one statistic over the cells a coverage selects
#[must_use]
pub fn zonal_statistic(
    values: &Array2<f64>,
    coverage: &Coverage,
    nodata: Option<f64>,
    statistic: ZonalStatistic,
) -> Option<f64> {
    let mut acc = Accumulator::new();
    for (row, col) in coverage.cells() {
        if let Some(&value) = values.get((row, col)) {
            acc.push(value, nodata);
        }
    }
    acc.finish(statistic)
}

/// Accumulate every cell of a band, used for quick band summaries
#[must_use]
pub fn band_accumulator(values: &Array2<f64>, nodata: Option<f64>) -> Accumulator {
    let mut acc = Accumulator::new();
    for &value in values {
        acc.push(value, nodata);
    }
    acc
}
