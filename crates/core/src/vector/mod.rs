//! Vector data structures
//!
//! Features read from a boundary file, and the [`Boundary`] polygon union
//! used to mask rasters.

use crate::error::{Error, Result};
use geo::{BoundingRect, Intersects};
use geo_types::{Geometry, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Union of the polygons of a field boundary.
///
/// The polygons are treated as an unordered union: a point is inside the
/// boundary when it intersects any of them, edges included. A boundary always
/// holds at least one polygon with a finite bounding rectangle.
#[derive(Debug, Clone)]
pub struct Boundary {
    polygons: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Boundary {
    /// Build a boundary from polygons
    pub fn new(polygons: Vec<Polygon<f64>>) -> Result<Self> {
        let polygons = MultiPolygon(polygons);
        let bounds = polygons
            .bounding_rect()
            .ok_or_else(|| Error::Geometry("boundary contains no polygons".into()))?;
        let finite = [bounds.min(), bounds.max()]
            .iter()
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !finite {
            return Err(Error::Geometry("boundary has non-finite coordinates".into()));
        }
        Ok(Self { polygons, bounds })
    }

    /// Collect the polygon geometries of a feature collection.
    ///
    /// Features without geometry and non-areal geometries are skipped.
    pub fn from_features(features: &FeatureCollection) -> Result<Self> {
        let mut polygons = Vec::new();
        for (i, feature) in features.iter().enumerate() {
            match &feature.geometry {
                Some(geometry) => collect_polygons(geometry, &mut polygons, i),
                None => warn!("feature {} has no geometry, skipping", i),
            }
        }
        Self::new(polygons)
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    /// Number of polygons in the union
    pub fn len(&self) -> usize {
        self.polygons.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// Bounding rectangle of the union
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Whether (x, y) lies inside the union; points on an edge are inside.
    pub fn covers(&self, x: f64, y: f64) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        if x < min.x || x > max.x || y < min.y || y > max.y {
            return false;
        }
        let point = Point::new(x, y);
        self.polygons.0.iter().any(|poly| poly.intersects(&point))
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>, feature: usize) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_polygons(g, out, feature);
            }
        }
        _ => warn!("feature {} has a non-polygon geometry, skipping", feature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Coord, LineString};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn test_empty_boundary_is_geometry_error() {
        assert!(matches!(Boundary::new(vec![]), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_covers_includes_edges() {
        let boundary = Boundary::new(vec![square(0.0, 0.0, 10.0)]).unwrap();
        assert!(boundary.covers(5.0, 5.0));
        assert!(boundary.covers(0.0, 5.0));
        assert!(boundary.covers(10.0, 10.0));
        assert!(!boundary.covers(10.5, 5.0));
    }

    #[test]
    fn test_covers_respects_holes() {
        let outer = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]);
        let boundary = Boundary::new(vec![Polygon::new(outer, vec![hole])]).unwrap();
        assert!(!boundary.covers(5.0, 5.0));
        assert!(boundary.covers(2.0, 2.0));
    }

    #[test]
    fn test_union_of_disjoint_polygons() {
        let boundary = Boundary::new(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]).unwrap();
        assert_eq!(boundary.len(), 2);
        assert!(boundary.covers(0.5, 0.5));
        assert!(boundary.covers(5.5, 5.5));
        assert!(!boundary.covers(3.0, 3.0));
        assert_eq!(boundary.bounds().max(), Coord { x: 6.0, y: 6.0 });
    }

    #[test]
    fn test_from_features_skips_non_polygons() {
        let mut features = FeatureCollection::new();
        features.push(Feature::new(Geometry::Point(Point::new(1.0, 1.0))));
        features.push(Feature::empty());
        features.push(Feature::new(Geometry::Polygon(square(0.0, 0.0, 2.0))));

        let boundary = Boundary::from_features(&features).unwrap();
        assert_eq!(boundary.len(), 1);

        let mut only_points = FeatureCollection::new();
        only_points.push(Feature::new(Geometry::Point(Point::new(1.0, 1.0))));
        assert!(matches!(Boundary::from_features(&only_points), Err(Error::Geometry(_))));
    }
}
