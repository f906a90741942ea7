//! GeoJSON vector masks.
//!
//! Only Polygon and MultiPolygon features are accepted. Positions may
//! carry a Z (or M) ordinate; anything past x and y is dropped.

use crate::atomic::read_text;
use crate::error::StoreError;
use canopy_kernel::feature::Ring;
use canopy_kernel::{Feature, FeatureCollection, Geometry};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

const GEOJSON_EXTENSIONS: &[&str] = &["geojson", "json"];

pub fn load_vector_mask(path: &Path) -> Result<FeatureCollection, StoreError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !GEOJSON_EXTENSIONS.contains(&extension.as_str()) {
        return Err(StoreError::UnsupportedVectorFormat {
            path: path.display().to_string(),
            extension,
        });
    }
    let text = read_text(path)?;
    let collection = parse_feature_collection(path, &text)?;
    tracing::debug!(
        path = %path.display(),
        features = collection.len(),
        crs = collection.crs.as_deref().unwrap_or("unknown"),
        "vector mask loaded"
    );
    Ok(collection)
}

pub fn parse_feature_collection(path: &Path, text: &str) -> Result<FeatureCollection, StoreError> {
    let root: Value = serde_json::from_str(text).map_err(|e| StoreError::parse(path, e))?;
    let object = root
        .as_object()
        .ok_or_else(|| StoreError::parse(path, "top level must be a JSON object"))?;
    if object.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(StoreError::parse(path, "expected a GeoJSON FeatureCollection"));
    }
    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse(path, "missing 'features' array"))?;

    let features = features
        .iter()
        .enumerate()
        .map(|(index, value)| parse_feature(path, index, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureCollection {
        crs: legacy_crs_name(object),
        features,
    })
}

fn legacy_crs_name(object: &Map<String, Value>) -> Option<String> {
    object
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn parse_feature(path: &Path, index: usize, value: &Value) -> Result<Feature, StoreError> {
    let at = |message: String| StoreError::parse(path, format!("feature {index}: {message}"));

    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => index.to_string(),
    };
    let geometry = value
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| at("missing geometry".to_string()))?;
    let geometry = parse_geometry(geometry).map_err(at)?;
    geometry.validate()?;

    let attributes = match value.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        Some(Value::Null) | None => BTreeMap::new(),
        Some(other) => return Err(at(format!("properties must be an object, got {other}"))),
    };

    Ok(Feature {
        id,
        geometry,
        attributes,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry has no type")?;
    let coordinates = value.get("coordinates").ok_or("geometry has no coordinates")?;
    match kind {
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coordinates)?)),
        "MultiPolygon" => coordinates
            .as_array()
            .ok_or("MultiPolygon coordinates must be an array")?
            .iter()
            .map(parse_rings)
            .collect::<Result<Vec<_>, _>>()
            .map(Geometry::MultiPolygon),
        other => Err(format!("unsupported geometry type '{other}'")),
    }
}

fn parse_rings(value: &Value) -> Result<Vec<Ring>, String> {
    value
        .as_array()
        .ok_or("polygon coordinates must be an array of rings")?
        .iter()
        .map(|ring| {
            ring.as_array()
                .ok_or("ring must be an array of positions")?
                .iter()
                .map(parse_position)
                .collect::<Result<Ring, _>>()
        })
        .collect()
}

fn parse_position(value: &Value) -> Result<[f64; 2], String> {
    let coords = value.as_array().ok_or("position must be an array")?;
    match (
        coords.first().and_then(Value::as_f64),
        coords.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok([x, y]),
        _ => Err(format!("position needs numeric x and y, got {value}")),
    }
}
