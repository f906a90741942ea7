//! ESRI ASCII grid codec (`.asc`).
//!
//! ```text
//! ncols         3
//! nrows         2
//! xllcorner     100.0
//! yllcorner     200.0
//! cellsize      10.0
//! NODATA_value  -9999
//! 0.1 0.2 0.3
//! 0.4 0.5 0.6
//! ```
//!
//! Rows are stored top to bottom. The format has no CRS slot; a sibling
//! `.prj` file, when present, carries the identifier.

use crate::error::StoreError;
use canopy_kernel::{GeoTransform, Grid};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

pub fn decode(path: &Path, text: &str) -> Result<Grid, StoreError> {
    let mut header = Header::default();
    let mut lines = text.lines().peekable();

    while let Some(&line) = lines.peek() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            lines.next();
            continue;
        };
        if key.parse::<f64>().is_ok() || key.eq_ignore_ascii_case("nan") {
            break;
        }
        let value = parts
            .next()
            .ok_or_else(|| StoreError::parse(path, format!("header '{key}' has no value")))?;
        let number = |v: &str| {
            v.parse::<f64>()
                .map_err(|e| StoreError::parse(path, format!("header '{key}': {e}")))
        };
        let count = |v: &str| {
            v.parse::<usize>()
                .map_err(|e| StoreError::parse(path, format!("header '{key}': {e}")))
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(count(value)?),
            "nrows" => header.nrows = Some(count(value)?),
            "xllcorner" => header.xll = Some((number(value)?, false)),
            "xllcenter" => header.xll = Some((number(value)?, true)),
            "yllcorner" => header.yll = Some((number(value)?, false)),
            "yllcenter" => header.yll = Some((number(value)?, true)),
            "cellsize" => header.cellsize = Some(number(value)?),
            "nodata_value" => header.nodata = Some(number(value)?),
            other => {
                return Err(StoreError::parse(path, format!("unknown header '{other}'")));
            }
        }
        lines.next();
    }

    let missing = |name: &str| StoreError::parse(path, format!("missing header '{name}'"));
    let width = header.ncols.ok_or_else(|| missing("ncols"))?;
    let height = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let (xll, x_centered) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_centered) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    if cellsize <= 0.0 {
        return Err(StoreError::parse(path, "cellsize must be positive"));
    }

    let left = if x_centered { xll - cellsize / 2.0 } else { xll };
    let bottom = if y_centered { yll - cellsize / 2.0 } else { yll };
    let top = bottom + cellsize * height as f64;

    let values = lines
        .flat_map(str::split_whitespace)
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| StoreError::parse(path, format!("cell '{token}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Grid::new(
        width,
        height,
        GeoTransform::north_up(left, top, cellsize, cellsize),
        header.nodata,
        values,
    )?)
}

/// Only north-up grids with square pixels fit the format.
pub fn encode(path: &Path, grid: &Grid) -> Result<String, StoreError> {
    grid.check_shape()?;
    let t = &grid.transform;
    if !t.is_north_up() || (t.a + t.e).abs() > f64::EPSILON * t.a.abs().max(1.0) {
        return Err(StoreError::Encode {
            path: path.display().to_string(),
            message: "ESRI ASCII needs a north-up transform with square pixels".to_string(),
        });
    }
    let cellsize = t.a;
    let bottom = t.f - cellsize * grid.height as f64;

    let mut out = String::new();
    let _ = writeln!(out, "ncols {}", grid.width);
    let _ = writeln!(out, "nrows {}", grid.height);
    let _ = writeln!(out, "xllcorner {}", t.c);
    let _ = writeln!(out, "yllcorner {bottom}");
    let _ = writeln!(out, "cellsize {cellsize}");
    if let Some(nodata) = grid.nodata {
        let _ = writeln!(out, "NODATA_value {nodata}");
    }
    for row in grid.values.chunks(grid.width.max(1)) {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "{line}");
    }
    Ok(out)
}
