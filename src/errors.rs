//! Centralized error handling for zonal_means
//!
//! Setup failures (missing boundary file, unusable job file) propagate out of
//! the pipeline as [`ZonalError`]. Per-year failures are caught by the
//! aggregator and only ever logged.

use std::fmt;
use std::path::PathBuf;

/// Main error type for zonal_means operations
#[derive(Debug)]
pub enum ZonalError {
    /// GDAL raster, vector or CRS errors
    GdalError(gdal::errors::GdalError),

    /// I/O operation errors
    IoError(std::io::Error),

    /// CSV serialization errors
    CsvError(csv::Error),

    /// Job file could not be parsed
    ConfigParseError(toml::de::Error),

    /// Manifest serialization errors
    JsonError(serde_json::Error),

    /// Boundary dataset missing on disk
    BoundaryNotFound { path: PathBuf },

    /// Attribute field missing from the boundary layer
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    /// Raster file missing on disk
    RasterNotFound { path: PathBuf },

    /// Requested band is not present in the raster
    BandOutOfRange {
        path: PathBuf,
        band: usize,
        count: usize,
    },

    /// Geotransform has rotation terms
    RotatedRaster { path: PathBuf },

    /// Job description is inconsistent
    InvalidConfig { message: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error for ad-hoc messages
    Generic(String),
}

impl fmt::Display for ZonalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZonalError::GdalError(e) => write!(f, "GDAL error: {}", e),
            ZonalError::IoError(e) => write!(f, "I/O error: {}", e),
            ZonalError::CsvError(e) => write!(f, "CSV error: {}", e),
            ZonalError::ConfigParseError(e) => write!(f, "Job file error: {}", e),
            ZonalError::JsonError(e) => write!(f, "Manifest error: {}", e),
            ZonalError::BoundaryNotFound { path } => {
                write!(f, "Boundary file '{}' not found", path.display())
            }
            ZonalError::FieldNotFound { field, available } => write!(
                f,
                "Field '{}' not found in boundary layer (available: {})",
                field,
                available.join(", ")
            ),
            ZonalError::RasterNotFound { path } => {
                write!(f, "Raster file '{}' not found", path.display())
            }
            ZonalError::BandOutOfRange { path, band, count } => write!(
                f,
                "Band {} requested from '{}' which has {} band(s)",
                band,
                path.display(),
                count
            ),
            ZonalError::RotatedRaster { path } => write!(
                f,
                "Raster '{}' has a rotated geotransform, only north-up grids are supported",
                path.display()
            ),
            ZonalError::InvalidConfig { message } => write!(f, "Invalid job: {}", message),
            ZonalError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            ZonalError::ArrayError(e) => write!(f, "Array error: {}", e),
            ZonalError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ZonalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZonalError::GdalError(e) => Some(e),
            ZonalError::IoError(e) => Some(e),
            ZonalError::CsvError(e) => Some(e),
            ZonalError::ConfigParseError(e) => Some(e),
            ZonalError::JsonError(e) => Some(e),
            ZonalError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<gdal::errors::GdalError> for ZonalError {
    fn from(error: gdal::errors::GdalError) -> Self {
        ZonalError::GdalError(error)
    }
}

impl From<std::io::Error> for ZonalError {
    fn from(error: std::io::Error) -> Self {
        ZonalError::IoError(error)
    }
}

impl From<csv::Error> for ZonalError {
    fn from(error: csv::Error) -> Self {
        ZonalError::CsvError(error)
    }
}

impl From<toml::de::Error> for ZonalError {
    fn from(error: toml::de::Error) -> Self {
        ZonalError::ConfigParseError(error)
    }
}

impl From<serde_json::Error> for ZonalError {
    fn from(error: serde_json::Error) -> Self {
        ZonalError::JsonError(error)
    }
}

impl From<ndarray::ShapeError> for ZonalError {
    fn from(error: ndarray::ShapeError) -> Self {
        ZonalError::ArrayError(error)
    }
}

impl From<String> for ZonalError {
    fn from(error: String) -> Self {
        ZonalError::Generic(error)
    }
}

impl From<&str> for ZonalError {
    fn from(error: &str) -> Self {
        ZonalError::Generic(error.to_string())
    }
}

/// Result type alias for zonal_means operations
pub type Result<T> = std::result::Result<T, ZonalError>;
