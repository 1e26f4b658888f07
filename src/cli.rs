//! Defines command-line interface options using `clap` for zonal-means.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zonal_means::config::YearRange;
use zonal_means::statistics::ZonalStatistic;

/// A CLI tool for per-region, per-year raster statistics
#[derive(Parser, Debug)]
#[command(
    version,
    name = "zonal-means",
    about = "Zonal statistics of raster stacks over administrative boundaries"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path of the output CSV. Overrides the job's own output path.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Statistic to compute per region. Defaults to the job's statistic (mean).
    #[arg(long, global = true, value_enum)]
    pub stat: Option<ZonalStatistic>,

    /// Restrict every variable to these years, formatted as <start>:<end>
    #[arg(long, global = true)]
    pub years: Option<YearRange>,

    /// Write a JSON run manifest next to the CSV
    #[arg(long, global = true, default_value_t = false)]
    pub manifest: bool,

    /// Number of preview rows printed after writing
    #[arg(long, global = true, default_value_t = 5)]
    pub preview: usize,

    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Yearly precipitation and temperature rasters, wide output
    Climate {
        /// Directory holding the boundary file and the Kharif_* folders
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Multi-band remote-sensing index rasters, long output
    Indices {
        /// Directory holding the boundary file and the data/ folder
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Run a job described by a TOML file
    Run {
        /// Path to the job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Describe a raster (bands, no-data, CRS) or, with --boundary, a vector file
    Inspect {
        path: PathBuf,

        /// Treat the path as a boundary dataset
        #[arg(long)]
        boundary: bool,
    },
}
