//! Raster and boundary inspection
//!
//! Used by the `inspect` command to check inputs before a run: band counts,
//! no-data values, CRS, and the attribute fields available for region names.

use crate::errors::{Result, ZonalError};
use crate::raster::RasterLayer;
use crate::statistics::{band_accumulator, ZonalStatistic};
use gdal::vector::LayerAccess;
use gdal::Dataset;
use std::path::{Path, PathBuf};

/// Quick statistics for one band
#[derive(Debug, Clone, PartialEq)]
pub struct BandSummary {
    pub index: usize,
    pub no_data: Option<f64>,
    pub valid_cells: u64,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

/// Structured description of a raster file
#[derive(Debug, Clone)]
pub struct RasterSummary {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub geo_transform: [f64; 6],
    pub crs_wkt: Option<String>,
    pub bands: Vec<BandSummary>,
}

impl RasterSummary {
    pub fn print(&self) {
        println!("\n===== Raster: {} =====", self.path.display());
        println!("Size: {} x {} cells", self.width, self.height);
        println!("Geotransform: {:?}", self.geo_transform);
        match &self.crs_wkt {
            Some(wkt) => println!("CRS: {}", first_line(wkt)),
            None => println!("CRS: (none)"),
        }
        println!("Bands: {}", self.bands.len());
        for band in &self.bands {
            let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
            println!(
                "  Band {:>3}: nodata={}, valid={}, min={}, mean={}, max={}",
                band.index,
                band.no_data.map_or_else(|| "none".to_string(), |v| v.to_string()),
                band.valid_cells,
                fmt(band.min),
                fmt(band.mean),
                fmt(band.max)
            );
        }
    }
}

/// Structured description of a boundary file
#[derive(Debug, Clone)]
pub struct BoundarySummary {
    pub path: PathBuf,
    pub feature_count: u64,
    pub crs_wkt: Option<String>,
    pub fields: Vec<String>,
}

impl BoundarySummary {
    pub fn print(&self) {
        println!("\n===== Boundary: {} =====", self.path.display());
        println!("Features: {}", self.feature_count);
        match &self.crs_wkt {
            Some(wkt) => println!("CRS: {}", first_line(wkt)),
            None => println!("CRS: (none)"),
        }
        println!("Available fields: {}", self.fields.join(", "));
    }
}

fn first_line(wkt: &str) -> &str {
    wkt.lines().next().unwrap_or(wkt)
}

/// Describe every band of a raster.
///
/// # Errors
///
/// Returns an error if the raster cannot be opened or a band cannot be read.
pub fn describe_raster(path: &Path) -> Result<RasterSummary> {
    let layer = RasterLayer::open(path)?;
    let grid = *layer.grid();

    let bands = (1..=layer.band_count())
        .map(|index| {
            let no_data = layer.no_data(index)?;
            let values = layer.read_band(index)?;
            let acc = band_accumulator(&values, no_data);
            Ok(BandSummary {
                index,
                no_data,
                valid_cells: acc.count(),
                min: acc.finish(ZonalStatistic::Min),
                mean: acc.finish(ZonalStatistic::Mean),
                max: acc.finish(ZonalStatistic::Max),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RasterSummary {
        path: path.to_path_buf(),
        width: grid.width,
        height: grid.height,
        geo_transform: grid.geo_transform,
        crs_wkt: layer.crs_wkt().map(ToString::to_string),
        bands,
    })
}

/// Describe the first layer of a vector dataset.
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be opened.
pub fn describe_boundary(path: &Path) -> Result<BoundarySummary> {
    if !path.exists() {
        return Err(ZonalError::BoundaryNotFound {
            path: path.to_path_buf(),
        });
    }

    let dataset = Dataset::open(path)?;
    let layer = dataset.layer(0)?;

    Ok(BoundarySummary {
        path: path.to_path_buf(),
        feature_count: layer.feature_count(),
        crs_wkt: layer.spatial_ref().and_then(|srs| srs.to_wkt().ok()),
        fields: layer.defn().fields().map(|field| field.name()).collect(),
    })
}
