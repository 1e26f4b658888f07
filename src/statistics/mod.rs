//! Zonal statistics over raster bands
//!
//! # Organization
//!
//! - [`operations`]: statistics and the cell accumulator
//! - [`rasterize`]: polygon to cell selection under an inclusion rule
//! - [`parallel`]: per-region evaluation on the rayon pool

pub mod operations;
pub mod parallel;
pub mod rasterize;

pub use operations::{band_accumulator, is_nodata, zonal_statistic, Accumulator, ZonalStatistic};
pub use parallel::{compute_coverages, zonal_stats_for_band};
pub use rasterize::{Coverage, InclusionRule, PixelWindow};
