//! Parallel evaluation across regions
//!
//! Regions are independent, so both rasterization and band statistics fan out
//! over the global rayon pool. `collect` on an indexed parallel iterator keeps
//! region order, so results line up with the boundary set.

use super::operations::{zonal_statistic, ZonalStatistic};
use super::rasterize::{Coverage, InclusionRule};
use crate::boundary::Region;
use crate::raster::GridGeometry;
use ndarray::Array2;
use rayon::prelude::*;

/// Rasterize every region onto a grid
#[must_use]
pub fn compute_coverages(
    regions: &[Region],
    grid: &GridGeometry,
    rule: InclusionRule,
) -> Vec<Coverage> {
    log::debug!(
        "Rasterizing {} regions onto {}x{} grid across {} threads",
        regions.len(),
        grid.width,
        grid.height,
        rayon::current_num_threads()
    );

    regions
        .par_iter()
        .map(|region| Coverage::compute(&region.geometry, grid, rule))
        .collect()
}

/// Evaluate one statistic for every region on a single band
#[must_use]
pub fn zonal_stats_for_band(
    values: &Array2<f64>,
    coverages: &[Coverage],
    nodata: Option<f64>,
    statistic: ZonalStatistic,
) -> Vec<Option<f64>> {
    coverages
        .par_iter()
        .map(|coverage| zonal_statistic(values, coverage, nodata, statistic))
        .collect()
}
