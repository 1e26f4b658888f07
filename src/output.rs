//! Reshaping observations into tables and writing them out
//!
//! Observations are always collected in long form. [`Table::long`] keeps
//! that shape, [`Table::wide`] pivots variables into columns. Both sort their
//! rows so repeated runs produce byte-identical CSV files.

use crate::config::{JobConfig, OutputLayout, YearRange};
use crate::errors::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One statistic for one region, variable and year
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub region_id: usize,
    pub region_name: String,
    pub variable: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// One region-year with a value per variable
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub region_id: usize,
    pub region_name: String,
    pub year: i32,
    pub values: Vec<Option<f64>>,
}

/// Sort by region name, variable, year; region id breaks ties between
/// regions sharing a name
pub fn sort_long(observations: &mut [Observation]) {
    observations.sort_by(|a, b| {
        a.region_name
            .cmp(&b.region_name)
            .then_with(|| a.variable.cmp(&b.variable))
            .then_with(|| a.year.cmp(&b.year))
            .then_with(|| a.region_id.cmp(&b.region_id))
    });
}

/// Pivot observations to one row per (region, year), sorted by year then id.
///
/// `variables` fixes the column order; observations for other variables are
/// ignored.
#[must_use]
pub fn pivot_wide(observations: &[Observation], variables: &[String]) -> Vec<WideRow> {
    let mut rows: BTreeMap<(i32, usize), WideRow> = BTreeMap::new();

    for observation in observations {
        let Some(column) = variables.iter().position(|v| *v == observation.variable) else {
            continue;
        };

        let row = rows
            .entry((observation.year, observation.region_id))
            .or_insert_with(|| WideRow {
                region_id: observation.region_id,
                region_name: observation.region_name.clone(),
                year: observation.year,
                values: vec![None; variables.len()],
            });
        row.values[column] = observation.value;
    }

    rows.into_values().collect()
}

/// CSV cell for a value: shortest round-trip form that always keeps a
/// decimal point (`35.0`, `3.5`); nulls are empty
#[must_use]
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

/// A header and string rows ready for CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// `unique_id,state_name,index_name,year,rasterValue`, sorted with [`sort_long`]
    #[must_use]
    pub fn long(mut observations: Vec<Observation>) -> Self {
        sort_long(&mut observations);

        let header = ["unique_id", "state_name", "index_name", "year", "rasterValue"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let rows = observations
            .into_iter()
            .map(|o| {
                vec![
                    o.region_id.to_string(),
                    o.region_name,
                    o.variable,
                    o.year.to_string(),
                    format_value(o.value),
                ]
            })
            .collect();

        Self { header, rows }
    }

    /// `id,state_name,year,<Var>_val...` in variable order
    #[must_use]
    pub fn wide(observations: &[Observation], variables: &[String]) -> Self {
        let mut header: Vec<String> = vec!["id".into(), "state_name".into(), "year".into()];
        header.extend(variables.iter().map(|v| format!("{v}_val")));

        let rows = pivot_wide(observations, variables)
            .into_iter()
            .map(|row| {
                let mut cells = vec![row.region_id.to_string(), row.region_name, row.year.to_string()];
                cells.extend(row.values.into_iter().map(format_value));
                cells
            })
            .collect();

        Self { header, rows }
    }

    /// Build the table for a layout
    #[must_use]
    pub fn for_layout(layout: OutputLayout, observations: Vec<Observation>, variables: &[String]) -> Self {
        match layout {
            OutputLayout::Long => Self::long(observations),
            OutputLayout::Wide => Self::wide(&observations, variables),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Print the header and first `n` rows
    pub fn print_preview(&self, n: usize) {
        println!("\nFinal Data Preview:");
        println!("{}", self.header.join(" | "));
        for row in self.rows.iter().take(n) {
            println!("{}", row.join(" | "));
        }
        if self.rows.len() > n {
            println!("... ({} more rows)", self.rows.len() - n);
        }
    }
}

/// Writes tables to a CSV path
pub struct CsvTableWriter<'a> {
    output_path: &'a Path,
}

impl<'a> CsvTableWriter<'a> {
    #[must_use]
    pub const fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write the table, replacing any existing file and creating parent
    /// directories as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, table: &Table) -> Result<usize> {
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(self.output_path)?;
        writer.write_record(&table.header)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        log::info!(
            "Wrote {} rows to {}",
            table.len(),
            self.output_path.display()
        );
        Ok(table.len())
    }
}

/// Per-variable entry of the run manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestVariable {
    pub name: String,
    pub years: YearRange,
    pub completed_years: Vec<i32>,
    pub skipped_years: Vec<i32>,
}

/// JSON sidecar describing how a CSV was produced
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub created_at: String,
    pub tool_version: String,
    pub boundary: PathBuf,
    pub output: PathBuf,
    pub regions: usize,
    pub statistic: String,
    pub layout: OutputLayout,
    pub rows: usize,
    pub variables: Vec<ManifestVariable>,
}

impl RunManifest {
    #[must_use]
    pub fn new(config: &JobConfig, regions: usize, rows: usize, variables: Vec<ManifestVariable>) -> Self {
        Self {
            created_at: Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            boundary: config.boundary.clone(),
            output: config.output.clone(),
            regions,
            statistic: config.statistic.as_str().to_string(),
            layout: config.layout,
            rows,
            variables,
        }
    }

    /// `<output stem>.manifest.json` next to the CSV
    #[must_use]
    pub fn path_for(output: &Path) -> PathBuf {
        output.with_extension("manifest.json")
    }

    /// Write the manifest as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Saved run manifest to {}", path.display());
        Ok(())
    }
}
