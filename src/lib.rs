//! zonal_means: per-region, per-year raster statistics
//!
//! Aggregates raster stacks (precipitation, temperature, vegetation and
//! climate indices) over administrative boundary polygons and writes one CSV
//! per job. For each (region, year, variable) the crate rasterizes the region
//! onto the raster grid, takes the statistic (mean by default) of the valid
//! cells, and records the value or a null.
//!
//! ## Key Features
//!
//! - **Any GDAL input**: rasters and boundaries are read through GDAL/OGR
//! - **Year alignment**: one file per year, or one multi-band file per variable
//!   with its own first year (LAI and FPAR start in 2002)
//! - **Inclusion rules**: cell-centre or all-touched rasterization
//! - **CRS handling**: boundaries are reprojected to each raster's CRS
//! - **Parallel regions**: rasterization and statistics fan out with Rayon
//!
//! ## Module Organization
//!
//! - [`boundary`]: boundary loading and reprojection
//! - [`raster`]: raster access and grid geometry
//! - [`statistics`]: rasterization and zonal statistics
//! - [`config`]: job descriptions, presets and TOML job files
//! - [`aggregate`]: the per-variable loop and the job pipeline
//! - [`output`]: long/wide tables, CSV writing and the run manifest
//! - [`metadata`]: input inspection
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zonal_means::prelude::*;
//!
//! let config = JobConfig::indices(Path::new("/data/india"));
//! let report = run_job(&config).unwrap();
//! report.print_summary();
//! ```

pub mod aggregate;
pub mod boundary;
pub mod config;
pub mod errors;
pub mod metadata;
pub mod output;
pub mod parallel;
pub mod raster;
pub mod statistics;

pub use errors::{Result, ZonalError};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregate::{aggregate_variable, run_job, AggregationContext, JobReport};
    pub use crate::boundary::{BoundarySet, Region};
    pub use crate::config::{
        FailurePolicy, JobConfig, NodataPolicy, OutputLayout, RasterSource, VariableSpec,
        YearRange,
    };
    pub use crate::errors::{Result, ZonalError};
    pub use crate::output::{Observation, RunManifest, Table};
    pub use crate::parallel::ParallelConfig;
    pub use crate::raster::{GridGeometry, RasterLayer};
    pub use crate::statistics::{Coverage, InclusionRule, ZonalStatistic};
}
