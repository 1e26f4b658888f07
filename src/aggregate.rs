//! Per-variable aggregation and the job pipeline
//!
//! [`run_job`] drives a whole job: load boundaries, settle on a CRS, run
//! [`aggregate_variable`] for each variable, reshape and write. Failures inside
//! a single year are logged and handled per the variable's
//! [`FailurePolicy`]; only setup failures are returned as errors.

use crate::boundary::BoundarySet;
use crate::config::{FailurePolicy, JobConfig, NodataPolicy, VariableSpec, YearRange};
use crate::errors::{Result, ZonalError};
use crate::output::{CsvTableWriter, ManifestVariable, Observation, Table};
use crate::raster::{GridGeometry, RasterLayer};
use crate::statistics::{
    compute_coverages, zonal_stats_for_band, Coverage, InclusionRule, ZonalStatistic,
};
use gdal::spatial_ref::SpatialRef;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Result of aggregating one variable over its years
#[derive(Debug, Clone)]
pub struct VariableOutcome {
    pub variable: String,
    pub years: YearRange,
    pub observations: Vec<Observation>,
    /// Years that produced rows (including null rows)
    pub completed_years: BTreeSet<i32>,
    /// Years that produced nothing
    pub skipped_years: Vec<i32>,
}

impl VariableOutcome {
    /// Number of null values recorded
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.observations.iter().filter(|o| o.value.is_none()).count()
    }
}

struct CoverageEntry {
    crs: Option<String>,
    grid: GridGeometry,
    rule: InclusionRule,
    coverages: Vec<Coverage>,
}

/// Boundaries plus the reprojections and rasterizations computed so far.
///
/// Rasters sharing a CRS reuse one reprojected boundary set; rasters sharing
/// a grid and inclusion rule reuse one set of coverages.
pub struct AggregationContext<'a> {
    base: &'a BoundarySet,
    projected: HashMap<String, BoundarySet>,
    coverages: Vec<CoverageEntry>,
}

impl<'a> AggregationContext<'a> {
    #[must_use]
    pub fn new(base: &'a BoundarySet) -> Self {
        Self {
            base,
            projected: HashMap::new(),
            coverages: Vec::new(),
        }
    }

    #[must_use]
    pub const fn boundaries(&self) -> &BoundarySet {
        self.base
    }

    fn boundaries_in(&mut self, crs: Option<&str>) -> Result<&BoundarySet> {
        let Some(wkt) = crs else {
            return Ok(self.base);
        };
        if self.base.crs_wkt() == Some(wkt) {
            return Ok(self.base);
        }
        if !self.projected.contains_key(wkt) {
            let projected = self.base.reproject_to(wkt)?;
            self.projected.insert(wkt.to_string(), projected);
        }
        Ok(&self.projected[wkt])
    }

    fn coverages_for(
        &mut self,
        grid: &GridGeometry,
        crs: Option<&str>,
        rule: InclusionRule,
    ) -> Result<&[Coverage]> {
        let cached = self.coverages.iter().position(|entry| {
            entry.grid == *grid && entry.rule == rule && entry.crs.as_deref() == crs
        });

        let index = match cached {
            Some(index) => index,
            None => {
                let coverages = {
                    let boundaries = self.boundaries_in(crs)?;
                    compute_coverages(boundaries.regions(), grid, rule)
                };
                let empty = coverages.iter().filter(|c| c.is_empty()).count();
                if empty > 0 {
                    log::warn!("{empty} region(s) select no cells on this grid");
                }
                self.coverages.push(CoverageEntry {
                    crs: crs.map(ToString::to_string),
                    grid: *grid,
                    rule,
                    coverages,
                });
                self.coverages.len() - 1
            }
        };

        Ok(&self.coverages[index].coverages)
    }

    /// Statistic for every region on one band of one raster
    ///
    /// # Errors
    ///
    /// Returns an error if the raster cannot be opened or read, the band is
    /// missing, or the boundaries cannot be moved into the raster CRS.
    pub fn compute_band(
        &mut self,
        path: &Path,
        band: usize,
        nodata: NodataPolicy,
        rule: InclusionRule,
        statistic: ZonalStatistic,
    ) -> Result<Vec<Option<f64>>> {
        let layer = RasterLayer::open(path)?;
        layer.check_band(band)?;

        let nodata = match nodata {
            NodataPolicy::FromRaster => layer.no_data(band)?,
            NodataPolicy::Fixed(value) => Some(value),
        };

        let crs = layer.crs_wkt().map(ToString::to_string);
        let grid = *layer.grid();
        let values = layer.read_band(band)?;
        drop(layer);

        let coverages = self.coverages_for(&grid, crs.as_deref(), rule)?;
        Ok(zonal_stats_for_band(&values, coverages, nodata, statistic))
    }
}

/// Aggregate one variable over its valid years.
///
/// A missing or unreadable input skips the year or records null for every
/// region, depending on the variable's failure policy.
pub fn aggregate_variable(
    ctx: &mut AggregationContext<'_>,
    variable: &VariableSpec,
    statistic: ZonalStatistic,
) -> VariableOutcome {
    log::info!("Processing {} (years {})", variable.name, variable.years);

    let regions: Vec<(usize, String)> = ctx
        .boundaries()
        .regions()
        .iter()
        .map(|r| (r.id, r.name.clone()))
        .collect();

    let mut outcome = VariableOutcome {
        variable: variable.name.clone(),
        years: variable.years,
        observations: Vec::new(),
        completed_years: BTreeSet::new(),
        skipped_years: Vec::new(),
    };

    for year in variable.years.iter() {
        let Some((path, band)) = variable.source.resolve(year) else {
            log::warn!("{} has no band for {year}, skipping", variable.name);
            outcome.skipped_years.push(year);
            continue;
        };

        log::debug!("  {} {year}: {} band {band}", variable.name, path.display());

        let values = match ctx.compute_band(&path, band, variable.nodata, variable.inclusion, statistic) {
            Ok(values) => values,
            Err(e) => match variable.on_error {
                FailurePolicy::Skip => {
                    log::warn!("Could not process {year} for {}: {e}. Skipping.", variable.name);
                    outcome.skipped_years.push(year);
                    continue;
                }
                FailurePolicy::Null => {
                    log::warn!(
                        "Could not process {year} for {}: {e}. Recording null.",
                        variable.name
                    );
                    vec![None; regions.len()]
                }
            },
        };

        outcome
            .observations
            .extend(regions.iter().zip(values).map(|((id, name), value)| Observation {
                region_id: *id,
                region_name: name.clone(),
                variable: variable.name.clone(),
                year,
                value,
            }));
        outcome.completed_years.insert(year);
    }

    outcome
}

/// Years every variable completed
#[must_use]
pub fn common_years(outcomes: &[VariableOutcome]) -> BTreeSet<i32> {
    let mut iter = outcomes.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first.completed_years.clone(), |acc, outcome| {
        acc.intersection(&outcome.completed_years).copied().collect()
    })
}

/// Summary of a finished job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub output: PathBuf,
    pub regions: usize,
    pub rows_written: usize,
    pub variables: Vec<ManifestVariable>,
    /// Years removed because some variable lacked them
    pub dropped_years: Vec<i32>,
    pub table: Table,
}

impl JobReport {
    pub fn print_summary(&self) {
        println!("\n📊 Processing complete");
        println!("   Regions: {}", self.regions);
        for variable in &self.variables {
            println!(
                "   {}: {} of {} year(s) computed{}",
                variable.name,
                variable.completed_years.len(),
                variable.years.len(),
                if variable.skipped_years.is_empty() {
                    String::new()
                } else {
                    format!(", skipped {:?}", variable.skipped_years)
                }
            );
        }
        if !self.dropped_years.is_empty() {
            println!("   Years dropped for incomplete inputs: {:?}", self.dropped_years);
        }
        println!("✅ Saved {} rows to {}", self.rows_written, self.output.display());
    }
}

/// CRS the boundaries are moved into before any raster is read
fn resolve_target_crs(config: &JobConfig) -> Result<Option<String>> {
    if let Some(definition) = &config.target_crs {
        let srs = SpatialRef::from_definition(definition)?;
        return Ok(Some(srs.to_wkt()?));
    }

    let reference = config.variables.iter().find_map(|variable| {
        variable
            .years
            .iter()
            .filter_map(|year| variable.source.resolve(year))
            .map(|(path, _)| path)
            .find(|path| path.exists())
    });

    let Some(reference) = reference else {
        return Err(ZonalError::InvalidConfig {
            message: "no input raster found to take the reference CRS from".to_string(),
        });
    };

    let layer = RasterLayer::open(&reference)?;
    log::info!("Reference raster: {}", reference.display());
    match layer.crs_wkt() {
        Some(wkt) => Ok(Some(wkt.to_string())),
        None => {
            log::warn!("Reference raster declares no CRS, leaving boundaries as loaded");
            Ok(None)
        }
    }
}

/// Run a whole job and write its CSV.
///
/// # Errors
///
/// Returns an error for setup failures: invalid job, missing boundary file or
/// name field, no usable reference CRS, or a failed write.
pub fn run_job(config: &JobConfig) -> Result<JobReport> {
    config.validate()?;

    log::info!("Loading boundaries from {}", config.boundary.display());
    let loaded = BoundarySet::load(&config.boundary, &config.name_field)?;
    log::info!("Available fields: {:?}", loaded.field_names());

    let boundaries = match resolve_target_crs(config)? {
        Some(wkt) => loaded.reproject_to(&wkt)?,
        None => loaded,
    };

    let mut ctx = AggregationContext::new(&boundaries);
    log::info!(
        "Starting zonal {} calculation for {} variable(s)",
        config.statistic.as_str(),
        config.variables.len()
    );

    let outcomes: Vec<VariableOutcome> = config
        .variables
        .iter()
        .map(|variable| aggregate_variable(&mut ctx, variable, config.statistic))
        .collect();

    let mut dropped_years = Vec::new();
    let mut observations: Vec<Observation> = Vec::new();
    if config.joint_years {
        let keep = common_years(&outcomes);
        let all: BTreeSet<i32> = outcomes
            .iter()
            .flat_map(|o| o.years.iter())
            .collect();
        dropped_years = all.difference(&keep).copied().collect();
        for year in &dropped_years {
            log::warn!("Year {year} is incomplete across variables, dropping it");
        }
        for outcome in &outcomes {
            observations.extend(
                outcome
                    .observations
                    .iter()
                    .filter(|o| keep.contains(&o.year))
                    .cloned(),
            );
        }
    } else {
        for outcome in &outcomes {
            observations.extend(outcome.observations.iter().cloned());
        }
    }

    let variables: Vec<ManifestVariable> = outcomes
        .iter()
        .map(|outcome| ManifestVariable {
            name: outcome.variable.clone(),
            years: outcome.years,
            completed_years: outcome.completed_years.iter().copied().collect(),
            skipped_years: outcome.skipped_years.clone(),
        })
        .collect();

    let null_values: usize = outcomes.iter().map(VariableOutcome::null_count).sum();
    if null_values > 0 {
        log::info!("{null_values} value(s) recorded as null");
    }

    log::info!("Consolidating results and saving to CSV");
    let table = Table::for_layout(config.layout, observations, &config.variable_names());
    let rows_written = CsvTableWriter::new(&config.output).write(&table)?;

    Ok(JobReport {
        output: config.output.clone(),
        regions: boundaries.len(),
        rows_written,
        variables,
        dropped_years,
        table,
    })
}
