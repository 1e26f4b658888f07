//! Administrative boundary loading and reprojection
//!
//! Boundaries are read through OGR, so any vector format GDAL understands
//! (Shapefile, GeoJSON, GeoPackage) works. Each feature becomes a [`Region`]
//! whose id is the feature's zero-based position in the layer.

use crate::errors::{Result, ZonalError};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::LayerAccess;
use gdal::Dataset;
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use std::path::Path;

/// An administrative polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: usize,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Ordered regions and the CRS their coordinates are expressed in
#[derive(Debug, Clone)]
pub struct BoundarySet {
    regions: Vec<Region>,
    crs_wkt: Option<String>,
    field_names: Vec<String>,
}

impl BoundarySet {
    /// Build a set from regions already in memory
    #[must_use]
    pub fn new(regions: Vec<Region>, crs_wkt: Option<String>) -> Self {
        Self {
            regions,
            crs_wkt,
            field_names: Vec::new(),
        }
    }

    /// Load the first layer of a vector dataset.
    ///
    /// Features without an areal geometry are skipped with a warning; ids of
    /// the remaining regions still match their feature index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be opened, or lacks
    /// `name_field`.
    pub fn load(path: &Path, name_field: &str) -> Result<Self> {
        if !path.exists() {
            return Err(ZonalError::BoundaryNotFound {
                path: path.to_path_buf(),
            });
        }

        let dataset = Dataset::open(path)?;
        let mut layer = dataset.layer(0)?;

        let field_names: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();
        if !field_names.iter().any(|name| name == name_field) {
            return Err(ZonalError::FieldNotFound {
                field: name_field.to_string(),
                available: field_names,
            });
        }

        let crs_wkt = layer.spatial_ref().and_then(|srs| srs.to_wkt().ok());

        let mut regions = Vec::new();
        for (id, feature) in layer.features().enumerate() {
            let name = feature
                .fields()
                .find(|(field, _)| field == name_field)
                .and_then(|(_, value)| value)
                .and_then(|value| value.into_string())
                .unwrap_or_default();

            let Some(geometry) = feature.geometry() else {
                log::warn!("Feature {id} ('{name}') has no geometry, skipping");
                continue;
            };

            match to_multipolygon(geometry.to_geo()?) {
                Some(geometry) => regions.push(Region { id, name, geometry }),
                None => log::warn!("Feature {id} ('{name}') is not a polygon, skipping"),
            }
        }

        log::info!(
            "Loaded {} regions from {}",
            regions.len(),
            path.display()
        );

        Ok(Self {
            regions,
            crs_wkt,
            field_names,
        })
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub fn crs_wkt(&self) -> Option<&str> {
        self.crs_wkt.as_deref()
    }

    /// Attribute fields of the source layer
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Return a copy of this set expressed in another CRS.
    ///
    /// A set whose CRS is unknown is assumed to already be in the target CRS.
    ///
    /// # Errors
    ///
    /// Returns an error if either CRS cannot be parsed or a coordinate fails
    /// to transform.
    pub fn reproject_to(&self, target_wkt: &str) -> Result<Self> {
        let mut target = SpatialRef::from_wkt(target_wkt)?;

        let Some(source_wkt) = self.crs_wkt.as_deref() else {
            log::warn!("Boundary CRS unknown, assuming it matches the raster CRS");
            return Ok(Self {
                crs_wkt: Some(target_wkt.to_string()),
                ..self.clone()
            });
        };

        let mut source = SpatialRef::from_wkt(source_wkt)?;
        if source == target {
            return Ok(self.clone());
        }

        log::info!("CRS mismatch found, reprojecting boundaries to match rasters");

        source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let transform = CoordTransform::new(&source, &target)?;

        let regions = self
            .regions
            .iter()
            .map(|region| {
                Ok(Region {
                    id: region.id,
                    name: region.name.clone(),
                    geometry: reproject_multipolygon(&region.geometry, &transform)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            regions,
            crs_wkt: Some(target_wkt.to_string()),
            field_names: self.field_names.clone(),
        })
    }
}

/// Keep the areal part of a geometry
fn to_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        Geometry::GeometryCollection(collection) => {
            let polygons: Vec<Polygon<f64>> = collection
                .into_iter()
                .filter_map(to_multipolygon)
                .flat_map(|multi| multi.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    transform: &CoordTransform,
) -> Result<MultiPolygon<f64>> {
    let polygons = geometry
        .0
        .iter()
        .map(|polygon| {
            let exterior = reproject_ring(polygon.exterior(), transform)?;
            let interiors = polygon
                .interiors()
                .iter()
                .map(|ring| reproject_ring(ring, transform))
                .collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(exterior, interiors))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MultiPolygon::new(polygons))
}

fn reproject_ring(ring: &LineString<f64>, transform: &CoordTransform) -> Result<LineString<f64>> {
    let mut xs: Vec<f64> = ring.coords().map(|c| c.x).collect();
    let mut ys: Vec<f64> = ring.coords().map(|c| c.y).collect();
    let mut zs = vec![0.0_f64; xs.len()];

    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    Ok(LineString::new(
        xs.into_iter()
            .zip(ys)
            .map(|(x, y)| Coord { x, y })
            .collect(),
    ))
}
