//! Job description: which rasters, which years, which rules
//!
//! A [`JobConfig`] is built either from one of the built-in presets
//! ([`JobConfig::climate`], [`JobConfig::indices`]) or from a TOML job file.
//!
//! ```toml
//! boundary = "India_State_Boundary.shp"
//! output = "ndvi.csv"
//! layout = "long"
//!
//! [[variables]]
//! name = "NDVI"
//! years = { start = 2000, end = 2020 }
//! nodata = -9999.0
//! source = { kind = "multi_band", path = "data/NDVI_kharif_2000to2020.tif", first_year = 2000 }
//! ```

use crate::errors::{Result, ZonalError};
use crate::statistics::{InclusionRule, ZonalStatistic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Remote-sensing indices processed by the `indices` preset
pub const DEFAULT_INDICES: [&str; 7] = ["NDVI", "EVI", "DTR", "FPAR", "LAI", "NDMI", "VHI"];

/// MODIS LAI/FPAR products start two years after the other products
const LATE_START_INDICES: [&str; 2] = ["LAI", "FPAR"];

/// Years a job may ask for
pub const SUPPORTED_YEARS: YearRange = YearRange::new(0, 9999);

/// Fixed sentinel used by the index rasters
pub const INDEX_NODATA: f64 = -9999.0;

/// Inclusive range of years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Valid range for a remote-sensing index
    #[must_use]
    pub fn for_index(name: &str) -> Self {
        if LATE_START_INDICES
            .iter()
            .any(|late| late.eq_ignore_ascii_case(name))
        {
            Self::new(2002, 2020)
        } else {
            Self::new(2000, 2020)
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }

    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let span = i64::from(self.end) - i64::from(self.start) + 1;
        usize::try_from(span).unwrap_or(usize::MAX)
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    /// Overlap of two ranges, `None` when they do not meet
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let range = Self::new(self.start.max(other.start), self.end.min(other.end));
        (!range.is_empty()).then_some(range)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parses `<start>:<end>` or a single `<year>`
impl FromStr for YearRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| format!("Invalid year '{}'", part.trim()))
        };

        let parts: Vec<&str> = s.split(':').collect();
        let range = match parts.as_slice() {
            [year] => {
                let year = parse(year)?;
                Self::new(year, year)
            }
            [start, end] => Self::new(parse(start)?, parse(end)?),
            _ => return Err("Invalid format: Expected '<start>:<end>'.".to_string()),
        };

        if range.is_empty() {
            return Err(format!("Start year {} is after end year {}", range.start, range.end));
        }
        Ok(range)
    }
}

/// Where a variable's yearly layers live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RasterSource {
    /// One single-band file per year: `<directory>/<prefix>_<year>.tif`
    YearlyFiles { directory: PathBuf, prefix: String },
    /// One multi-band file, band 1 holding `first_year`
    MultiBand { path: PathBuf, first_year: i32 },
}

impl RasterSource {
    /// File and 1-based band holding a year.
    ///
    /// Returns `None` for years before a multi-band file's first year.
    #[must_use]
    pub fn resolve(&self, year: i32) -> Option<(PathBuf, usize)> {
        match self {
            Self::YearlyFiles { directory, prefix } => {
                Some((directory.join(format!("{prefix}_{year}.tif")), 1))
            }
            Self::MultiBand { path, first_year } => {
                let offset = usize::try_from(year - first_year).ok()?;
                Some((path.clone(), offset + 1))
            }
        }
    }

    fn rebase(&mut self, base: &Path) {
        match self {
            Self::YearlyFiles { directory, .. } => *directory = base.join(&*directory),
            Self::MultiBand { path, .. } => *path = base.join(&*path),
        }
    }
}

/// How no-data cells are recognised
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum NodataPolicy {
    /// Use the no-data value declared on each band
    #[default]
    FromRaster,
    /// Use a fixed sentinel regardless of what the raster declares
    Fixed(f64),
}

impl From<Option<f64>> for NodataPolicy {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::FromRaster, Self::Fixed)
    }
}

impl From<NodataPolicy> for Option<f64> {
    fn from(policy: NodataPolicy) -> Self {
        match policy {
            NodataPolicy::FromRaster => None,
            NodataPolicy::Fixed(value) => Some(value),
        }
    }
}

/// What to record when a year cannot be computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Omit the year for this variable
    Skip,
    /// Emit a null value for every region
    #[default]
    Null,
}

/// Output table shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `unique_id,state_name,index_name,year,rasterValue`
    #[default]
    Long,
    /// `id,state_name,year,<Var>_val...`
    Wide,
}

/// One raster variable to aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub source: RasterSource,
    pub years: YearRange,
    #[serde(default)]
    pub nodata: NodataPolicy,
    #[serde(default)]
    pub inclusion: InclusionRule,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

fn default_name_field() -> String {
    "State_Name".to_string()
}

/// A complete aggregation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Boundary polygon dataset
    pub boundary: PathBuf,
    /// Attribute holding the region name
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// CRS the boundaries are moved to before processing (any GDAL user
    /// input such as `EPSG:4326`); when absent the first readable raster's
    /// CRS is used
    #[serde(default)]
    pub target_crs: Option<String>,
    #[serde(default)]
    pub statistic: ZonalStatistic,
    pub output: PathBuf,
    #[serde(default)]
    pub layout: OutputLayout,
    /// Drop a year for every variable unless every variable completed it
    #[serde(default)]
    pub joint_years: bool,
    pub variables: Vec<VariableSpec>,
}

impl JobConfig {
    /// Yearly precipitation and temperature files, all-touched, wide output
    #[must_use]
    pub fn climate(root: &Path) -> Self {
        let years = YearRange::new(2000, 2020);
        let yearly = |name: &str, directory: &str, prefix: &str| VariableSpec {
            name: name.to_string(),
            source: RasterSource::YearlyFiles {
                directory: root.join(directory),
                prefix: prefix.to_string(),
            },
            years,
            nodata: NodataPolicy::FromRaster,
            inclusion: InclusionRule::AllTouched,
            on_error: FailurePolicy::Skip,
        };

        Self {
            boundary: root.join("India_State_Boundary.shp"),
            name_field: default_name_field(),
            target_crs: Some("EPSG:4326".to_string()),
            statistic: ZonalStatistic::Mean,
            output: root.join("india_yearly_climate_stats.csv"),
            layout: OutputLayout::Wide,
            joint_years: true,
            variables: vec![
                yearly("Precipitation", "Kharif_Precipitation", "precip"),
                yearly("Temperature", "Kharif_temperature", "temp"),
            ],
        }
    }

    /// One multi-band file per remote-sensing index, long output
    #[must_use]
    pub fn indices(root: &Path) -> Self {
        let variables = DEFAULT_INDICES
            .iter()
            .map(|&name| {
                let years = YearRange::for_index(name);
                VariableSpec {
                    name: name.to_string(),
                    source: RasterSource::MultiBand {
                        path: root.join("data").join(format!("{name}_kharif_2000to2020.tif")),
                        first_year: years.start,
                    },
                    years,
                    nodata: NodataPolicy::Fixed(INDEX_NODATA),
                    inclusion: InclusionRule::Centre,
                    on_error: FailurePolicy::Null,
                }
            })
            .collect();

        Self {
            boundary: root.join("India_State_Boundary.shp"),
            name_field: default_name_field(),
            target_crs: None,
            statistic: ZonalStatistic::Mean,
            output: root.join("india_all_indices_zonal_stats.csv"),
            layout: OutputLayout::Long,
            joint_years: false,
            variables,
        }
    }

    /// Read a TOML job file. Relative paths are taken relative to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML job without touching the filesystem
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid job description.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn rebase(&mut self, base: &Path) {
        self.boundary = base.join(&self.boundary);
        self.output = base.join(&self.output);
        for variable in &mut self.variables {
            variable.source.rebase(base);
        }
    }

    /// Restrict every variable to a window of years.
    ///
    /// Variables whose own range does not meet the window are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no variable is left.
    pub fn restrict_years(&mut self, window: YearRange) -> Result<()> {
        self.variables.retain_mut(|variable| match variable.years.intersect(&window) {
            Some(years) => {
                variable.years = years;
                true
            }
            None => {
                log::warn!(
                    "{} has no data in {} (valid {}), dropping it",
                    variable.name,
                    window,
                    variable.years
                );
                false
            }
        });

        if self.variables.is_empty() {
            return Err(ZonalError::InvalidConfig {
                message: format!("no variable has data in {window}"),
            });
        }
        Ok(())
    }

    /// Check the job is internally consistent
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(ZonalError::InvalidConfig { message });

        if self.variables.is_empty() {
            return invalid("at least one variable is required".to_string());
        }
        if self.name_field.trim().is_empty() {
            return invalid("name_field must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            if variable.name.trim().is_empty() {
                return invalid("variable names must not be empty".to_string());
            }
            if !seen.insert(variable.name.as_str()) {
                return invalid(format!("variable '{}' is listed twice", variable.name));
            }
            if variable.years.is_empty() {
                return invalid(format!(
                    "variable '{}' starts in {} but ends in {}",
                    variable.name, variable.years.start, variable.years.end
                ));
            }
            if !SUPPORTED_YEARS.contains(variable.years.start)
                || !SUPPORTED_YEARS.contains(variable.years.end)
            {
                return invalid(format!(
                    "variable '{}' asks for years {}, outside {}",
                    variable.name, variable.years, SUPPORTED_YEARS
                ));
            }
            if let RasterSource::MultiBand { first_year, .. } = &variable.source {
                if *first_year > variable.years.start {
                    return invalid(format!(
                        "variable '{}' asks for {} but band 1 holds {}",
                        variable.name, variable.years.start, first_year
                    ));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }
}
