//! Polygon features: geometry plus a row of per-layer attributes.

use crate::error::{CanopyError, Result};
use crate::layer::LayerName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A closed ring of `[x, y]` vertices. The closing vertex may be repeated.
pub type Ring = Vec<[f64; 2]>;

/// A polygon: exterior ring followed by zero or more hole rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring) -> Self {
        Self {
            rings: vec![exterior],
        }
    }

    pub fn with_hole(mut self, hole: Ring) -> Self {
        self.rings.push(hole);
        self
    }

    /// Axis-aligned rectangle from `(min_x, min_y)` to `(max_x, max_y)`.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// The polygons making up this geometry.
    pub fn polygons(&self) -> Vec<Polygon> {
        match self {
            Geometry::Polygon(rings) => vec![Polygon {
                rings: rings.clone(),
            }],
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|rings| Polygon {
                    rings: rings.clone(),
                })
                .collect(),
        }
    }

    /// `(min_x, min_y, max_x, max_y)` over every vertex.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for polygon in self.polygons() {
            for [x, y] in polygon.rings.iter().flatten().copied() {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    }
                });
            }
        }
        bounds
    }

    pub fn validate(&self) -> Result<()> {
        let polygons = self.polygons();
        if polygons.is_empty() {
            return Err(CanopyError::InvalidGeometry(
                "multipolygon has no parts".to_string(),
            ));
        }
        for polygon in polygons {
            if polygon.rings.is_empty() {
                return Err(CanopyError::InvalidGeometry(
                    "polygon has no rings".to_string(),
                ));
            }
            for ring in &polygon.rings {
                if ring.len() < 3 {
                    return Err(CanopyError::InvalidGeometry(format!(
                        "ring has {} vertices, need at least 3",
                        ring.len()
                    )));
                }
                if ring.iter().flatten().any(|c| !c.is_finite()) {
                    return Err(CanopyError::InvalidGeometry(
                        "ring has a non-finite coordinate".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Geometry::Polygon(polygon.rings)
    }
}

/// One polygon feature with its attribute row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: impl Into<Geometry>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, layer: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(layer.to_string(), value.into());
        self
    }

    /// The raw attribute for a layer; `null` counts as absent.
    pub fn attribute(&self, layer: &LayerName) -> Option<&Value> {
        self.attributes
            .get(layer.as_str())
            .filter(|value| !value.is_null())
    }

    /// The attribute coerced to a number.
    ///
    /// Absent and `null` attributes are `Ok(None)`. Numeric strings are
    /// accepted; any other value is a [`CanopyError::ValueCoercion`].
    pub fn number(&self, layer: &LayerName) -> Result<Option<f64>> {
        let Some(value) = self.attribute(layer) else {
            return Ok(None);
        };
        let coerced = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        coerced
            .map(Some)
            .ok_or_else(|| CanopyError::ValueCoercion {
                feature_id: self.id.clone(),
                layer: layer.to_string(),
                value: value.to_string(),
            })
    }

    /// Percentage for a layer: 0 when absent or NaN.
    pub fn pct(&self, layer: &LayerName) -> Result<f64> {
        Ok(self
            .number(layer)?
            .filter(|value| !value.is_nan())
            .unwrap_or(0.0))
    }
}

/// Ordered features with the collection's CRS identifier, if known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub crs: Option<String>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            crs: None,
            features,
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
