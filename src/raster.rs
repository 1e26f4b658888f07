//! Raster access through GDAL
//!
//! A [`RasterLayer`] wraps an open GDAL dataset together with the grid
//! geometry the zonal statistics need. Bands are read whole into
//! `ndarray::Array2<f64>` (rows x columns) whatever the band's storage
//! type, so Float64 and large integer bands keep their precision.

use crate::errors::{Result, ZonalError};
use gdal::Dataset;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Size and georeferencing of a raster grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    /// GDAL ordering: origin x, pixel width, row rotation, origin y, column rotation, pixel height
    pub geo_transform: [f64; 6],
}

impl GridGeometry {
    #[must_use]
    pub const fn new(width: usize, height: usize, geo_transform: [f64; 6]) -> Self {
        Self {
            width,
            height,
            geo_transform,
        }
    }

    /// True when the grid has no rotation terms and non-degenerate pixel sizes
    #[must_use]
    pub fn is_north_up(&self) -> bool {
        let gt = &self.geo_transform;
        gt[2] == 0.0 && gt[4] == 0.0 && gt[1] != 0.0 && gt[5] != 0.0
    }

    /// Convert world coordinates to fractional pixel coordinates (column, row).
    ///
    /// Cell `(row, col)` covers `[col, col + 1) x [row, row + 1)` in pixel space.
    #[must_use]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let gt = &self.geo_transform;
        ((x - gt[0]) / gt[1], (y - gt[3]) / gt[5])
    }

    /// World coordinates of a cell centre
    #[must_use]
    pub fn cell_centre(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        let px = col as f64 + 0.5;
        let py = row as f64 + 0.5;
        (gt[0] + px * gt[1], gt[3] + py * gt[5])
    }

    /// World bounds as (min_x, min_y, max_x, max_y)
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let gt = &self.geo_transform;
        let x0 = gt[0];
        let x1 = gt[0] + self.width as f64 * gt[1];
        let y0 = gt[3];
        let y1 = gt[3] + self.height as f64 * gt[5];
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// An open raster dataset
pub struct RasterLayer {
    path: PathBuf,
    dataset: Dataset,
    grid: GridGeometry,
    band_count: usize,
    crs_wkt: Option<String>,
}

impl RasterLayer {
    /// Open a raster and capture its grid, band count and CRS.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be opened by GDAL, has no
    /// geotransform, or is rotated.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ZonalError::RasterNotFound {
                path: path.to_path_buf(),
            });
        }

        let dataset = Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform()?;
        let grid = GridGeometry::new(width, height, geo_transform);

        if !grid.is_north_up() {
            return Err(ZonalError::RotatedRaster {
                path: path.to_path_buf(),
            });
        }

        #[allow(clippy::unnecessary_cast)]
        let band_count = dataset.raster_count() as usize;
        let crs_wkt = dataset.spatial_ref().ok().and_then(|srs| srs.to_wkt().ok());

        log::debug!(
            "Opened raster {} ({}x{}, {} band(s))",
            path.display(),
            width,
            height,
            band_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            dataset,
            grid,
            band_count,
            crs_wkt,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    #[must_use]
    pub const fn band_count(&self) -> usize {
        self.band_count
    }

    /// CRS of the raster as WKT, if one is declared
    #[must_use]
    pub fn crs_wkt(&self) -> Option<&str> {
        self.crs_wkt.as_deref()
    }

    /// Ensure a 1-based band index exists in this raster
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::BandOutOfRange`] when it does not.
    pub fn check_band(&self, band: usize) -> Result<()> {
        if band == 0 || band > self.band_count {
            return Err(ZonalError::BandOutOfRange {
                path: self.path.clone(),
                band,
                count: self.band_count,
            });
        }
        Ok(())
    }

    /// No-data value declared on a band
    ///
    /// # Errors
    ///
    /// Returns an error if the band does not exist.
    pub fn no_data(&self, band: usize) -> Result<Option<f64>> {
        self.check_band(band)?;
        let rasterband = self.dataset.rasterband(band)?;
        Ok(rasterband.no_data_value())
    }

    /// Read a whole band as `(rows, cols)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the band does not exist or GDAL fails to read it.
    pub fn read_band(&self, band: usize) -> Result<Array2<f64>> {
        self.check_band(band)?;
        let rasterband = self.dataset.rasterband(band)?;
        let size = (self.grid.width, self.grid.height);
        let buffer = rasterband.read_as::<f64>((0, 0), size, size, None)?;
        let data = buffer.data().to_vec();

        Ok(Array2::from_shape_vec(
            (self.grid.height, self.grid.width),
            data,
        )?)
    }
}
