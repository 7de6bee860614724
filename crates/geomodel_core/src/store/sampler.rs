//! Vector geometry sampling into located attribute rows.
//!
//! # Responsibility
//! - Enumerate the vertices of vector features as `SampledRow`s.
//! - Resolve elevation from geometry Z or an elevation source.
//!
//! # Invariants
//! - Points yield one row, lines one row per vertex, polygons one row per
//!   ring vertex (exterior first, then interiors).
//! - `feature_id` is the zero-based index of the source feature.
//! - Geometry Z is used only when requested and present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One attribute cell of a vector feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view; text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) if value.is_finite() => Some(*value),
            Self::Text(value) => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Number(_) | Self::Null => None,
        }
    }

    /// Name view used for unit/fault keys; `None` for null or blank text.
    pub fn as_name(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(value) => Some(value.to_string()),
            Self::Number(value) => Some(value.to_string()),
            Self::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

/// Vertex with optional elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// Supported vector geometry shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    /// Rings: exterior first, then holes.
    Polygon(Vec<Vec<Coord>>),
}

impl Geometry {
    fn vertices(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Self::Point(coord) => Box::new(std::iter::once(coord)),
            Self::MultiPoint(coords) | Self::LineString(coords) => Box::new(coords.iter()),
            Self::MultiLineString(parts) | Self::Polygon(parts) => {
                Box::new(parts.iter().flat_map(|part| part.iter()))
            }
        }
    }
}

/// One vector feature: geometry plus attribute table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFeature {
    pub geometry: Geometry,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl VectorFeature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Located row sampled from one vertex of a vector feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledRow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Index of the source feature in the sampled collection.
    pub feature_id: usize,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl SampledRow {
    pub fn number(&self, field: &str) -> Option<f64> {
        self.attributes.get(field).and_then(AttributeValue::as_f64)
    }

    pub fn name(&self, field: &str) -> Option<String> {
        self.attributes.get(field).and_then(AttributeValue::as_name)
    }
}

/// Elevation lookup used when geometry carries no usable Z.
pub trait ElevationSource {
    fn elevation(&self, x: f64, y: f64) -> f64;
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn elevation(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Flat surface at a constant elevation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstantElevation(pub f64);

impl ElevationSource for ConstantElevation {
    fn elevation(&self, _x: f64, _y: f64) -> f64 {
        self.0
    }
}

/// Returns every vertex of every feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllSampler;

impl AllSampler {
    pub fn sample(
        &self,
        features: &[VectorFeature],
        elevation: &dyn ElevationSource,
        use_z: bool,
    ) -> Vec<SampledRow> {
        let mut rows = Vec::new();
        for (feature_id, feature) in features.iter().enumerate() {
            for coord in feature.geometry.vertices() {
                let z = match coord.z {
                    Some(z) if use_z => z,
                    _ => elevation.elevation(coord.x, coord.y),
                };
                rows.push(SampledRow {
                    x: coord.x,
                    y: coord.y,
                    z,
                    feature_id,
                    attributes: feature.attributes.clone(),
                });
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::{AllSampler, AttributeValue, ConstantElevation, Coord, Geometry, VectorFeature};

    #[test]
    fn samples_every_vertex_with_feature_index() {
        let features = vec![
            VectorFeature::new(Geometry::Point(Coord::xy(0.0, 0.0)))
                .with_attribute("unit", AttributeValue::Text("Sand".to_string())),
            VectorFeature::new(Geometry::MultiLineString(vec![
                vec![Coord::xy(1.0, 1.0), Coord::xy(2.0, 2.0)],
                vec![Coord::xy(3.0, 3.0)],
            ])),
            VectorFeature::new(Geometry::Polygon(vec![
                vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 0.0), Coord::xy(0.0, 0.0)],
                vec![Coord::xy(0.2, 0.2)],
            ])),
        ];

        let rows = AllSampler.sample(&features, &ConstantElevation(7.0), false);
        assert_eq!(rows.len(), 1 + 3 + 4);
        assert_eq!(rows[0].name("unit").as_deref(), Some("Sand"));
        assert!(rows[1..4].iter().all(|row| row.feature_id == 1));
        assert!(rows.iter().all(|row| row.z == 7.0));
    }

    #[test]
    fn geometry_z_wins_only_when_requested() {
        let features = vec![VectorFeature::new(Geometry::LineString(vec![
            Coord::xyz(0.0, 0.0, 100.0),
            Coord::xy(5.0, 0.0),
        ]))];
        let dem = |x: f64, _y: f64| x * 2.0;

        let with_z = AllSampler.sample(&features, &dem, true);
        assert_eq!(with_z[0].z, 100.0);
        assert_eq!(with_z[1].z, 10.0);

        let without_z = AllSampler.sample(&features, &dem, false);
        assert_eq!(without_z[0].z, 0.0);
    }

    #[test]
    fn attribute_views_parse_numbers_and_names() {
        assert_eq!(AttributeValue::Text(" 12.5".to_string()).as_f64(), Some(12.5));
        assert_eq!(AttributeValue::Text("n/a".to_string()).as_f64(), None);
        assert_eq!(AttributeValue::Integer(3).as_name().as_deref(), Some("3"));
        assert_eq!(AttributeValue::Text("  ".to_string()).as_name(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }
}
