//! Geometry conversion, bounding boxes and containment.
//!
//! This module provides:
//! - GeoJSON geometry decoding into `geo_types` geometries
//! - WKT encoding and decoding, the format geometries are stored in
//! - Bounding boxes used by the candidate pre-filter
//! - Exact point containment used after inflation
//!
//! Coordinates are always (longitude, latitude), i.e. (x, y).

use std::str::FromStr;

use geo::{BoundingRect, Centroid, Contains};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use wkt::ToWkt;

use crate::error::{SpatialError, SpatialResult};

/// A GeoJSON position: `[longitude, latitude, (elevation)]`.
type Position = Vec<f64>;

/// GeoJSON geometry object as it appears in a Feature.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

impl GeoJsonGeometry {
    /// Convert into a `geo_types` geometry, validating positions and rings.
    pub fn to_geometry(&self) -> SpatialResult<Geometry<f64>> {
        let geom = match self {
            Self::Point { coordinates } => Geometry::Point(Point::from(coord(coordinates)?)),
            Self::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point::from))
                    .collect::<SpatialResult<_>>()?,
            )),
            Self::LineString { coordinates } => Geometry::LineString(line(coordinates)?),
            Self::MultiLineString { coordinates } => Geometry::MultiLineString(MultiLineString::new(
                coordinates.iter().map(|l| line(l)).collect::<SpatialResult<_>>()?,
            )),
            Self::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
            Self::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
                coordinates.iter().map(|p| polygon(p)).collect::<SpatialResult<_>>()?,
            )),
            Self::GeometryCollection { geometries } => {
                Geometry::GeometryCollection(GeometryCollection::new_from(
                    geometries
                        .iter()
                        .map(|g| g.to_geometry())
                        .collect::<SpatialResult<_>>()?,
                ))
            }
        };
        Ok(geom)
    }
}

fn coord(position: &[f64]) -> SpatialResult<Coord<f64>> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(SpatialError::invalid_field("geometry", "non-finite coordinate")),
        _ => Err(SpatialError::invalid_field(
            "geometry",
            format!("position needs at least 2 values, got {}", position.len()),
        )),
    }
}

fn line(positions: &[Position]) -> SpatialResult<LineString<f64>> {
    Ok(LineString::new(
        positions.iter().map(|p| coord(p)).collect::<SpatialResult<_>>()?,
    ))
}

fn polygon(rings: &[Vec<Position>]) -> SpatialResult<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings
        .next()
        .ok_or_else(|| SpatialError::invalid_field("geometry", "polygon has no exterior ring"))??;
    if exterior.0.len() < 4 {
        return Err(SpatialError::invalid_field(
            "geometry",
            format!("polygon ring needs at least 4 positions, got {}", exterior.0.len()),
        ));
    }
    let interiors = rings.collect::<SpatialResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Decode a GeoJSON geometry value.
pub fn from_geojson_value(value: &serde_json::Value) -> SpatialResult<Geometry<f64>> {
    let parsed: GeoJsonGeometry = serde_json::from_value(value.clone()).map_err(|e| {
        SpatialError::invalid_field("geometry", format!("invalid GeoJSON geometry: {}", e))
    })?;
    parsed.to_geometry()
}

/// Parse a WKT string into a geometry.
pub fn parse_wkt(text: &str) -> SpatialResult<Geometry<f64>> {
    wkt::Wkt::from_str(text)
        .map_err(|e| SpatialError::invalid_field("geometry", format!("WKT parse error: {:?}", e)))
        .and_then(|w| {
            w.try_into().map_err(|e: wkt::conversion::Error| {
                SpatialError::invalid_field("geometry", format!("WKT conversion error: {:?}", e))
            })
        })
}

/// Encode a geometry as WKT.
pub fn to_wkt(geom: &Geometry<f64>) -> String {
    geom.wkt_string()
}

/// Axis-aligned bounding box in (longitude, latitude) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Compute from a geometry; `None` for empty geometries.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    /// Inclusive point test; longitude first.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_x && lon <= self.max_x && lat >= self.min_y && lat <= self.max_y
    }
}

/// Centroid of a geometry; `None` for empty geometries.
pub fn centroid(geom: &Geometry<f64>) -> Option<Point<f64>> {
    geom.centroid()
}

/// Exact containment of a (longitude, latitude) point.
///
/// Only areal geometries contain points; everything else returns `false`.
/// Points on a polygon's boundary are not contained.
pub fn contains_point(geom: &Geometry<f64>, lon: f64, lat: f64) -> bool {
    let point = Point::new(lon, lat);
    match geom {
        Geometry::Polygon(p) => p.contains(&point),
        Geometry::MultiPolygon(mp) => mp.contains(&point),
        Geometry::Rect(r) => r.to_polygon().contains(&point),
        Geometry::Triangle(t) => t.to_polygon().contains(&point),
        Geometry::GeometryCollection(gc) => gc.iter().any(|g| contains_point(g, lon, lat)),
        _ => false,
    }
}

/// Split a geometry into its polygons, for per-polygon bounding boxes.
pub fn polygons(geom: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(polygons).collect(),
        _ => Vec::new(),
    }
}
