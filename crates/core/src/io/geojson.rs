//! GeoJSON reading for field boundaries
//!
//! Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
//! Coordinates are taken as-is; no CRS handling is done.

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Boundary, Feature, FeatureCollection};
use geo_types::{Coord, Geometry, GeometryCollection, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a GeoJSON file into a feature collection
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    debug!("reading GeoJSON {}", path.display());
    let text = fs::read_to_string(path)?;
    read_geojson_from_str(&text)
}

/// Parse GeoJSON text into a feature collection
pub fn read_geojson_from_str(text: &str) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_str(text)?;
    let mut collection = FeatureCollection::new();

    match value["type"].as_str() {
        Some("FeatureCollection") => {
            let features = value["features"]
                .as_array()
                .ok_or_else(|| Error::Geometry("FeatureCollection without a features array".into()))?;
            for feature in features {
                collection.push(parse_feature(feature)?);
            }
        }
        Some("Feature") => collection.push(parse_feature(&value)?),
        Some(_) => collection.push(Feature::new(parse_geometry(&value)?)),
        None => return Err(Error::Geometry("GeoJSON object has no type".into())),
    }

    Ok(collection)
}

/// Read a GeoJSON file and build the polygon union used for clipping
pub fn read_boundary<P: AsRef<Path>>(path: P) -> Result<Boundary> {
    let features = read_geojson(path)?;
    Boundary::from_features(&features)
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let mut feature = match &value["geometry"] {
        Value::Null => Feature::empty(),
        geometry => Feature::new(parse_geometry(geometry)?),
    };

    feature.id = match &value["id"] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    if let Some(properties) = value["properties"].as_object() {
        for (key, v) in properties {
            feature.set_property(key.clone(), parse_attribute(v));
        }
    }

    Ok(feature)
}

fn parse_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let kind = value["type"]
        .as_str()
        .ok_or_else(|| Error::Geometry("geometry has no type".into()))?;

    if kind == "GeometryCollection" {
        let members = value["geometries"]
            .as_array()
            .ok_or_else(|| Error::Geometry("GeometryCollection without geometries".into()))?;
        let geometries = members.iter().map(parse_geometry).collect::<Result<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geometries)));
    }

    let coords = &value["coordinates"];
    match kind {
        "Point" => Ok(Geometry::Point(Point(parse_coord(coords)?))),
        "LineString" => Ok(Geometry::LineString(LineString(parse_coords(coords)?))),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => {
            let polygons = as_array(coords, "MultiPolygon")?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon(polygons)))
        }
        other => Err(Error::Geometry(format!("unsupported geometry type: {}", other))),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::Geometry(format!("{} coordinates must be an array", what)))
}

/// Polygon coordinates: `[exterior, hole, hole, ...]`
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = as_array(value, "Polygon")?;
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| Error::Geometry("Polygon without an exterior ring".into()))?;

    let exterior = parse_ring(exterior)?;
    let interiors = interiors.iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let mut points = parse_coords(value)?;
    if points.len() < 3 {
        return Err(Error::Geometry(format!(
            "ring has {} positions, at least 3 are required",
            points.len()
        )));
    }
    if points.first() != points.last() {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

fn parse_coords(value: &Value) -> Result<Vec<Coord<f64>>> {
    as_array(value, "LineString")?.iter().map(parse_coord).collect()
}

fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pair = as_array(value, "Position")?;
    let number = |i: usize| {
        pair.get(i)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::Geometry(format!("invalid position: {}", value)))
    };
    Ok(Coord { x: number(0)?, y: number(1)? })
}
