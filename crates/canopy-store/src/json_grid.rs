//! JSON grid codec.
//!
//! ```json
//! {"width": 2, "height": 1, "transform": [1, 0, 0, 0, -1, 1],
//!  "nodata": -9999, "crs": "EPSG:3035", "values": [0.5, null]}
//! ```
//!
//! JSON has no NaN or infinity: `null` cells decode to NaN and NaN cells
//! encode to `null`. A NaN NoData sentinel is written as the string `"NaN"`.
//! Infinite cells and sentinels are written as `"Infinity"` / `"-Infinity"`.

use crate::error::StoreError;
use canopy_kernel::{GeoTransform, Grid};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct GridDocument {
    width: usize,
    height: usize,
    transform: [f64; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nodata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<String>,
    values: Vec<Value>,
}

/// A number, or one of the spellings JSON numbers cannot carry.
fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.eq_ignore_ascii_case("nan") => Some(f64::NAN),
        Value::String(s) if s == "Infinity" => Some(f64::INFINITY),
        Value::String(s) if s == "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn number_to(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value == f64::INFINITY {
        Value::String("Infinity".to_string())
    } else if value == f64::NEG_INFINITY {
        Value::String("-Infinity".to_string())
    } else {
        Value::from(value)
    }
}

pub fn decode(path: &Path, text: &str) -> Result<Grid, StoreError> {
    let doc: GridDocument = serde_json::from_str(text).map_err(|e| StoreError::parse(path, e))?;
    let nodata = match doc.nodata {
        None | Some(Value::Null) => None,
        Some(value) => Some(number_from(&value).ok_or_else(|| {
            StoreError::parse(
                path,
                format!("nodata must be a number, \"NaN\" or \"Infinity\", got {value}"),
            )
        })?),
    };
    let values = doc
        .values
        .iter()
        .map(|cell| match cell {
            Value::Null => Ok(f64::NAN),
            other => number_from(other).ok_or_else(|| {
                StoreError::parse(path, format!("cell must be a number, got {other}"))
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut grid = Grid::new(
        doc.width,
        doc.height,
        GeoTransform::from(doc.transform),
        nodata,
        values,
    )?;
    grid.crs = doc.crs;
    Ok(grid)
}

pub fn encode(path: &Path, grid: &Grid) -> Result<String, StoreError> {
    grid.check_shape()?;
    let doc = GridDocument {
        width: grid.width,
        height: grid.height,
        transform: grid.transform.into(),
        nodata: grid.nodata.map(number_to),
        crs: grid.crs.clone(),
        values: grid
            .values
            .iter()
            .map(|&v| if v.is_nan() { Value::Null } else { number_to(v) })
            .collect(),
    };
    let mut text = serde_json::to_string(&doc).map_err(|e| StoreError::Encode {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    text.push('\n');
    Ok(text)
}
