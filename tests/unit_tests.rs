//! Unit tests for zonal_means modules that do not touch GDAL files
//!
//! Rasterization and statistics run on synthetic grids; configuration and
//! output reshaping run on in-memory values.

use geo::{LineString, MultiPolygon, Polygon};
use ndarray::Array2;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use zonal_means::{
    aggregate::{common_years, VariableOutcome},
    config::{
        FailurePolicy, JobConfig, NodataPolicy, OutputLayout, RasterSource, VariableSpec,
        YearRange, DEFAULT_INDICES, INDEX_NODATA,
    },
    errors::ZonalError,
    output::{format_value, pivot_wide, sort_long, Observation, Table},
    parallel::{ParallelConfig, ParallelInfo},
    raster::GridGeometry,
    statistics::{is_nodata, zonal_statistic, Coverage, InclusionRule, ZonalStatistic},
};

/// 4x4 grid of unit cells covering x 0..4, y 0..4, north-up
fn unit_grid() -> GridGeometry {
    GridGeometry::new(4, 4, [0.0, 1.0, 0.0, 4.0, 0.0, -1.0])
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
    LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
}

fn multi(exterior: LineString<f64>, holes: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(exterior, holes)])
}

/// Values 1..=16 in row-major order
fn ramp() -> Array2<f64> {
    Array2::from_shape_vec((4, 4), (1..=16).map(f64::from).collect()).unwrap()
}

fn observation(id: usize, name: &str, variable: &str, year: i32, value: Option<f64>) -> Observation {
    Observation {
        region_id: id,
        region_name: name.to_string(),
        variable: variable.to_string(),
        year,
        value,
    }
}

#[test]
fn test_error_types() {
    let missing = ZonalError::BoundaryNotFound {
        path: PathBuf::from("India_State_Boundary.shp"),
    };
    assert!(format!("{}", missing).contains("Boundary file 'India_State_Boundary.shp' not found"));

    let field = ZonalError::FieldNotFound {
        field: "State_Name".to_string(),
        available: vec!["NAME_1".to_string(), "ID".to_string()],
    };
    let message = format!("{}", field);
    assert!(message.contains("Field 'State_Name'"));
    assert!(message.contains("NAME_1, ID"));

    let band = ZonalError::BandOutOfRange {
        path: PathBuf::from("LAI.tif"),
        band: 20,
        count: 19,
    };
    assert!(format!("{}", band).contains("Band 20 requested from 'LAI.tif' which has 19 band(s)"));

    let generic = ZonalError::Generic("Test error".to_string());
    assert_eq!(format!("{}", generic), "Test error");

    let from_str: ZonalError = "boom".into();
    assert!(matches!(from_str, ZonalError::Generic(msg) if msg == "boom"));
}

#[test]
fn test_parallel_config() {
    let default_pool = ParallelConfig::new(None);
    assert!(default_pool.setup_global_pool().is_ok());

    let zero = ParallelConfig::new(Some(0)).setup_global_pool();
    assert!(matches!(zero, Err(ZonalError::ThreadPoolError(_))));
}

#[test]
fn test_parallel_info() {
    let info = ParallelInfo::current();
    assert!(info.pool_threads > 0);
    assert!(info.cpu_cores > 0);
    info.print_info();
}

#[test]
fn test_zonal_statistic_names() {
    assert_eq!(ZonalStatistic::default(), ZonalStatistic::Mean);
    assert_eq!(ZonalStatistic::Mean.as_str(), "mean");
    assert_eq!(ZonalStatistic::Count.as_str(), "count");
    assert_eq!(format!("{:?}", ZonalStatistic::Max), "Max");
}

#[test]
fn test_year_range_parsing() {
    let range: YearRange = "2000:2020".parse().unwrap();
    assert_eq!(range, YearRange::new(2000, 2020));
    assert_eq!(range.len(), 21);

    let single: YearRange = "2010".parse().unwrap();
    assert_eq!(single, YearRange::new(2010, 2010));

    assert!("2020:2000".parse::<YearRange>().is_err());
    assert!("20x0:2020".parse::<YearRange>().is_err());
    assert!("2000:2010:2020".parse::<YearRange>().is_err());
}

#[test]
fn test_year_range_for_index() {
    assert_eq!(YearRange::for_index("LAI"), YearRange::new(2002, 2020));
    assert_eq!(YearRange::for_index("FPAR"), YearRange::new(2002, 2020));
    assert_eq!(YearRange::for_index("NDVI"), YearRange::new(2000, 2020));
    assert_eq!(YearRange::for_index("VHI"), YearRange::new(2000, 2020));
}

#[test]
fn test_year_range_intersect() {
    let lai = YearRange::new(2002, 2020);
    assert_eq!(
        lai.intersect(&YearRange::new(2000, 2005)),
        Some(YearRange::new(2002, 2005))
    );
    assert_eq!(lai.intersect(&YearRange::new(1990, 2001)), None);
    assert!(!lai.contains(2001));
    assert!(lai.contains(2002));
    assert_eq!(lai.iter().next(), Some(2002));
    assert_eq!(lai.iter().last(), Some(2020));
}

#[test]
fn test_raster_source_resolve() {
    let yearly = RasterSource::YearlyFiles {
        directory: PathBuf::from("Kharif_Precipitation"),
        prefix: "precip".to_string(),
    };
    assert_eq!(
        yearly.resolve(2005),
        Some((Path::new("Kharif_Precipitation").join("precip_2005.tif"), 1))
    );

    let stacked = RasterSource::MultiBand {
        path: PathBuf::from("data/LAI_kharif_2000to2020.tif"),
        first_year: 2002,
    };
    assert_eq!(
        stacked.resolve(2002),
        Some((PathBuf::from("data/LAI_kharif_2000to2020.tif"), 1))
    );
    assert_eq!(stacked.resolve(2020).map(|(_, band)| band), Some(19));
    assert_eq!(stacked.resolve(2001), None);
}

#[test]
fn test_indices_preset() {
    let config = JobConfig::indices(Path::new("/data"));
    assert!(config.validate().is_ok());
    assert_eq!(config.layout, OutputLayout::Long);
    assert!(!config.joint_years);
    assert!(config.target_crs.is_none());
    assert_eq!(config.variable_names(), DEFAULT_INDICES.map(String::from).to_vec());

    for variable in &config.variables {
        assert_eq!(variable.nodata, NodataPolicy::Fixed(INDEX_NODATA));
        assert_eq!(variable.inclusion, InclusionRule::Centre);
        assert_eq!(variable.on_error, FailurePolicy::Null);

        let RasterSource::MultiBand { path, first_year } = &variable.source else {
            panic!("Expected multi-band source for {}", variable.name);
        };
        assert_eq!(*first_year, variable.years.start);
        assert!(path.ends_with(format!("{}_kharif_2000to2020.tif", variable.name)));

        let expected_start = if variable.name == "LAI" || variable.name == "FPAR" {
            2002
        } else {
            2000
        };
        assert_eq!(variable.years, YearRange::new(expected_start, 2020));
    }
}

#[test]
fn test_climate_preset() {
    let config = JobConfig::climate(Path::new("/data"));
    assert!(config.validate().is_ok());
    assert_eq!(config.layout, OutputLayout::Wide);
    assert!(config.joint_years);
    assert_eq!(config.target_crs.as_deref(), Some("EPSG:4326"));
    assert_eq!(config.variable_names(), vec!["Precipitation", "Temperature"]);

    for variable in &config.variables {
        assert_eq!(variable.nodata, NodataPolicy::FromRaster);
        assert_eq!(variable.inclusion, InclusionRule::AllTouched);
        assert_eq!(variable.on_error, FailurePolicy::Skip);
        assert_eq!(variable.years, YearRange::new(2000, 2020));
    }
}

#[test]
fn test_validate_rejects_bad_jobs() {
    let mut config = JobConfig::indices(Path::new("/data"));
    config.variables.push(config.variables[0].clone());
    assert!(matches!(
        config.validate(),
        Err(ZonalError::InvalidConfig { message }) if message.contains("listed twice")
    ));

    let mut config = JobConfig::indices(Path::new("/data"));
    config.variables.clear();
    assert!(config.validate().is_err());

    let mut config = JobConfig::indices(Path::new("/data"));
    config.variables[0].years = YearRange::new(1999, 2020);
    assert!(matches!(
        config.validate(),
        Err(ZonalError::InvalidConfig { message }) if message.contains("band 1 holds 2000")
    ));
}

#[test]
fn test_unbounded_year_ranges() {
    let full = YearRange::new(i32::MIN, i32::MAX);
    assert_eq!(full.len(), usize::try_from(1_u64 << 32).unwrap_or(usize::MAX));
    assert_eq!(YearRange::new(2021, 2020).len(), 0);

    let text = r#"
        boundary = "states.geojson"
        output = "out.csv"

        [[variables]]
        name = "NDVI"
        years = { start = -2147483648, end = 2147483647 }
        source = { kind = "yearly_files", directory = "ndvi", prefix = "ndvi" }
    "#;
    let config = JobConfig::from_toml_str(text).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ZonalError::InvalidConfig { message }) if message.contains("outside 0-9999")
    ));

    let mut config = JobConfig::indices(Path::new("/data"));
    config.variables[0].years = YearRange::new(2000, 10_000);
    assert!(config.validate().is_err());
}

#[test]
fn test_toml_parsing() {
    let text = r#"
        boundary = "states.geojson"
        output = "out.csv"
        layout = "wide"
        statistic = "max"
        joint_years = true

        [[variables]]
        name = "NDVI"
        years = { start = 2000, end = 2002 }
        nodata = -9999
        inclusion = "all_touched"
        on_error = "skip"
        source = { kind = "multi_band", path = "ndvi.tif", first_year = 2000 }

        [[variables]]
        name = "Precipitation"
        years = { start = 2001, end = 2001 }
        source = { kind = "yearly_files", directory = "precip", prefix = "precip" }
    "#;

    let config = JobConfig::from_toml_str(text).unwrap();
    assert_eq!(config.name_field, "State_Name");
    assert_eq!(config.layout, OutputLayout::Wide);
    assert_eq!(config.statistic, ZonalStatistic::Max);
    assert!(config.joint_years);

    let ndvi = &config.variables[0];
    assert_eq!(ndvi.nodata, NodataPolicy::Fixed(-9999.0));
    assert_eq!(ndvi.inclusion, InclusionRule::AllTouched);
    assert_eq!(ndvi.on_error, FailurePolicy::Skip);

    let precip = &config.variables[1];
    assert_eq!(precip.nodata, NodataPolicy::FromRaster);
    assert_eq!(precip.inclusion, InclusionRule::Centre);
    assert_eq!(precip.on_error, FailurePolicy::Null);
    assert!(config.validate().is_ok());

    let broken = JobConfig::from_toml_str("boundary = 3");
    assert!(matches!(broken, Err(ZonalError::ConfigParseError(_))));
}

#[test]
fn test_restrict_years() {
    let mut config = JobConfig::indices(Path::new("/data"));
    config.restrict_years(YearRange::new(2000, 2001)).unwrap();

    // LAI and FPAR have no data before 2002
    assert_eq!(config.variables.len(), 5);
    assert!(config
        .variables
        .iter()
        .all(|v| v.years == YearRange::new(2000, 2001)));

    let mut config = JobConfig::indices(Path::new("/data"));
    assert!(config.restrict_years(YearRange::new(1990, 1995)).is_err());
}

#[test]
fn test_centre_rule_selects_cells_by_centre() {
    let grid = unit_grid();
    let polygon = multi(square(0.0, 2.0, 2.0, 4.0), vec![]);

    let coverage = Coverage::compute(&polygon, &grid, InclusionRule::Centre);
    let cells: Vec<(usize, usize)> = coverage.cells().collect();
    assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert!(coverage.contains(1, 1));
    assert!(!coverage.contains(2, 2));
}

#[test]
fn test_all_touched_adds_boundary_cells() {
    let grid = unit_grid();
    let polygon = multi(square(0.0, 2.0, 2.0, 4.0), vec![]);

    let centre = Coverage::compute(&polygon, &grid, InclusionRule::Centre);
    let touched = Coverage::compute(&polygon, &grid, InclusionRule::AllTouched);

    assert_eq!(touched.cell_count(), 9);
    assert!(centre.cells().all(|(r, c)| touched.contains(r, c)));
    assert!(touched.contains(2, 2));
    assert!(!touched.contains(3, 3));
}

#[test]
fn test_holes_are_excluded() {
    let grid = unit_grid();
    let polygon = multi(square(0.0, 0.0, 4.0, 4.0), vec![square(1.0, 1.0, 3.0, 3.0)]);

    let coverage = Coverage::compute(&polygon, &grid, InclusionRule::Centre);
    assert_eq!(coverage.cell_count(), 12);
    assert!(!coverage.contains(1, 1));
    assert!(!coverage.contains(2, 2));
    assert!(coverage.contains(0, 0));
    assert!(coverage.contains(3, 3));
}

#[test]
fn test_small_polygon_inside_one_cell() {
    let grid = unit_grid();
    // Inside cell (row 0, col 0) without covering its centre (0.5, 3.5)
    let polygon = multi(square(0.1, 3.1, 0.3, 3.3), vec![]);

    let centre = Coverage::compute(&polygon, &grid, InclusionRule::Centre);
    assert!(centre.is_empty());

    let touched = Coverage::compute(&polygon, &grid, InclusionRule::AllTouched);
    assert_eq!(touched.cells().collect::<Vec<_>>(), vec![(0, 0)]);
}

#[test]
fn test_polygon_outside_or_partly_outside_grid() {
    let grid = unit_grid();

    let outside = multi(square(10.0, 10.0, 12.0, 12.0), vec![]);
    assert!(Coverage::compute(&outside, &grid, InclusionRule::AllTouched).is_empty());

    // Extends west and north of the grid; only the in-grid part counts
    let partial = multi(square(-3.0, 3.0, 1.0, 7.0), vec![]);
    let coverage = Coverage::compute(&partial, &grid, InclusionRule::Centre);
    assert_eq!(coverage.cells().collect::<Vec<_>>(), vec![(0, 0)]);
}

#[test]
fn test_zonal_statistic_values() {
    let grid = unit_grid();
    let values = ramp();
    let polygon = multi(square(0.0, 2.0, 2.0, 4.0), vec![]);
    let coverage = Coverage::compute(&polygon, &grid, InclusionRule::Centre);

    // Cells 1, 2, 5, 6
    assert_eq!(zonal_statistic(&values, &coverage, None, ZonalStatistic::Mean), Some(3.5));
    assert_eq!(zonal_statistic(&values, &coverage, None, ZonalStatistic::Min), Some(1.0));
    assert_eq!(zonal_statistic(&values, &coverage, None, ZonalStatistic::Max), Some(6.0));
    assert_eq!(zonal_statistic(&values, &coverage, None, ZonalStatistic::Sum), Some(14.0));
    assert_eq!(zonal_statistic(&values, &coverage, None, ZonalStatistic::Count), Some(4.0));

    // Treat value 1 as no-data
    assert_eq!(
        zonal_statistic(&values, &coverage, Some(1.0), ZonalStatistic::Mean),
        Some(13.0 / 3.0)
    );
}

#[test]
fn test_zonal_statistic_without_valid_cells() {
    let grid = unit_grid();
    let values = Array2::from_elem((4, 4), -9999.0_f64);
    let polygon = multi(square(0.0, 0.0, 4.0, 4.0), vec![]);
    let coverage = Coverage::compute(&polygon, &grid, InclusionRule::Centre);

    assert_eq!(zonal_statistic(&values, &coverage, Some(-9999.0), ZonalStatistic::Mean), None);
    assert_eq!(
        zonal_statistic(&values, &coverage, Some(-9999.0), ZonalStatistic::Count),
        Some(0.0)
    );
    assert_eq!(
        zonal_statistic(&values, &Coverage::empty(), None, ZonalStatistic::Mean),
        None
    );

    let mut with_nan = ramp();
    with_nan[[0, 0]] = f64::NAN;
    assert_eq!(
        zonal_statistic(&with_nan, &coverage, None, ZonalStatistic::Count),
        Some(15.0)
    );
}

#[test]
fn test_is_nodata() {
    assert!(is_nodata(-9999.0, Some(-9999.0)));
    assert!(!is_nodata(0.0, Some(-9999.0)));
    assert!(!is_nodata(0.0, None));
    assert!(is_nodata(f64::NAN, Some(f64::NAN)));
    assert!(is_nodata(f64::from(f32::MIN), Some(f64::from(f32::MIN))));
    // Float32 band cells widened to f64 still match a decimal sentinel
    assert!(is_nodata(f64::from(f32::MIN), Some(-3.4028235e38)));
    // Values beyond f32 precision are compared exactly
    assert!(!is_nodata(16_777_217.0, Some(16_777_216.0)));
    assert!(is_nodata(16_777_216.0, Some(16_777_216.0)));
}

#[test]
fn test_sort_long_order() {
    let mut rows = vec![
        observation(1, "Bihar", "NDVI", 2001, Some(0.4)),
        observation(0, "Assam", "NDVI", 2000, Some(0.5)),
        observation(1, "Bihar", "EVI", 2000, None),
        observation(0, "Assam", "EVI", 2001, Some(0.2)),
        observation(0, "Assam", "EVI", 2000, Some(0.1)),
    ];
    sort_long(&mut rows);

    let keys: Vec<(&str, &str, i32)> = rows
        .iter()
        .map(|o| (o.region_name.as_str(), o.variable.as_str(), o.year))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Assam", "EVI", 2000),
            ("Assam", "EVI", 2001),
            ("Assam", "NDVI", 2000),
            ("Bihar", "EVI", 2000),
            ("Bihar", "NDVI", 2001),
        ]
    );
}

#[test]
fn test_long_table() {
    let table = Table::long(vec![
        observation(1, "Bihar", "NDVI", 2000, None),
        observation(0, "Assam", "NDVI", 2000, Some(0.25)),
    ]);

    assert_eq!(
        table.header,
        vec!["unique_id", "state_name", "index_name", "year", "rasterValue"]
    );
    assert_eq!(table.rows[0], vec!["0", "Assam", "NDVI", "2000", "0.25"]);
    assert_eq!(table.rows[1], vec!["1", "Bihar", "NDVI", "2000", ""]);
}

#[test]
fn test_wide_table_pivots_variables() {
    let variables = vec!["Precipitation".to_string(), "Temperature".to_string()];
    let observations = vec![
        observation(1, "Bihar", "Temperature", 2000, Some(28.5)),
        observation(0, "Assam", "Precipitation", 2001, Some(900.0)),
        observation(0, "Assam", "Temperature", 2000, Some(25.0)),
        observation(0, "Assam", "Precipitation", 2000, Some(1200.5)),
    ];

    let rows = pivot_wide(&observations, &variables);
    assert_eq!(rows.len(), 3);
    assert_eq!((rows[0].year, rows[0].region_id), (2000, 0));
    assert_eq!(rows[0].values, vec![Some(1200.5), Some(25.0)]);
    assert_eq!((rows[1].year, rows[1].region_id), (2000, 1));
    assert_eq!(rows[1].values, vec![None, Some(28.5)]);
    assert_eq!((rows[2].year, rows[2].region_id), (2001, 0));

    let table = Table::wide(&observations, &variables);
    assert_eq!(
        table.header,
        vec!["id", "state_name", "year", "Precipitation_val", "Temperature_val"]
    );
    assert_eq!(table.rows[1], vec!["1", "Bihar", "2000", "", "28.5"]);
    assert_eq!(table.rows[2], vec!["0", "Assam", "2001", "900.0", ""]);
}

#[test]
fn test_format_value() {
    assert_eq!(format_value(None), "");
    assert_eq!(format_value(Some(2.5)), "2.5");
    assert_eq!(format_value(Some(35.0)), "35.0");
    assert_eq!(format_value(Some(0.0)), "0.0");
    assert_eq!(format_value(Some(-0.125)), "-0.125");
}

#[test]
fn test_common_years() {
    let outcome = |name: &str, years: &[i32]| VariableOutcome {
        variable: name.to_string(),
        years: YearRange::new(2000, 2002),
        observations: Vec::new(),
        completed_years: years.iter().copied().collect(),
        skipped_years: Vec::new(),
    };

    let outcomes = vec![
        outcome("Precipitation", &[2000, 2001, 2002]),
        outcome("Temperature", &[2000, 2002]),
    ];
    assert_eq!(common_years(&outcomes), BTreeSet::from([2000, 2002]));
    assert!(common_years(&[]).is_empty());
}

#[test]
fn test_variable_spec_defaults() {
    let variable = VariableSpec {
        name: "EVI".to_string(),
        source: RasterSource::MultiBand {
            path: PathBuf::from("evi.tif"),
            first_year: 2000,
        },
        years: YearRange::new(2000, 2001),
        nodata: NodataPolicy::default(),
        inclusion: InclusionRule::default(),
        on_error: FailurePolicy::default(),
    };
    assert_eq!(variable.nodata, NodataPolicy::FromRaster);
    assert_eq!(variable.inclusion, InclusionRule::Centre);
    assert_eq!(variable.on_error, FailurePolicy::Null);
}
