//! Polygon-to-grid burning.

use crate::error::Result;
use crate::feature::{Geometry, Ring};
use crate::grid::{Footprint, GeoTransform, Grid};

/// Burns one geometry into a binary footprint aligned to a target grid.
pub trait Rasterizer {
    fn footprint(
        &self,
        geometry: &Geometry,
        width: usize,
        height: usize,
        transform: &GeoTransform,
    ) -> Result<Footprint>;

    /// Convenience: burn against an existing grid's footing.
    fn footprint_on(&self, geometry: &Geometry, grid: &Grid) -> Result<Footprint> {
        self.footprint(geometry, grid.width, grid.height, &grid.transform)
    }
}

/// Burns a cell when its centre falls inside the geometry.
///
/// Each polygon is tested even–odd over all of its rings, so holes punch
/// through the exterior. A multipolygon burns the union of its parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterRasterizer;

impl Rasterizer for CenterRasterizer {
    fn footprint(
        &self,
        geometry: &Geometry,
        width: usize,
        height: usize,
        transform: &GeoTransform,
    ) -> Result<Footprint> {
        geometry.validate()?;
        let mut footprint = Footprint::empty(width, height)?;
        let Some((min_x, min_y, max_x, max_y)) = geometry.bounds() else {
            return Ok(footprint);
        };
        let polygons = geometry.polygons();
        let (rows, cols) = candidate_window(transform, width, height, (min_x, min_y, max_x, max_y));

        for row in rows {
            for col in cols.clone() {
                let (x, y) = transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                if x < min_x || x > max_x || y < min_y || y > max_y {
                    continue;
                }
                if polygons
                    .iter()
                    .any(|polygon| inside_rings(&polygon.rings, x, y))
                {
                    footprint.mark(row, col);
                }
            }
        }
        Ok(footprint)
    }
}

/// Row/column ranges that can hold cell centres inside the bounds.
fn candidate_window(
    transform: &GeoTransform,
    width: usize,
    height: usize,
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    if !transform.is_north_up() {
        return (0..height, 0..width);
    }
    let clamp = |value: f64, limit: usize| -> usize {
        if value <= 0.0 {
            0
        } else {
            (value as usize).min(limit)
        }
    };
    let col_lo = clamp(((min_x - transform.c) / transform.a - 0.5).floor(), width);
    let col_hi = clamp(((max_x - transform.c) / transform.a + 0.5).ceil(), width);
    let row_lo = clamp(((max_y - transform.f) / transform.e - 0.5).floor(), height);
    let row_hi = clamp(((min_y - transform.f) / transform.e + 0.5).ceil(), height);
    (row_lo..row_hi, col_lo..col_hi)
}

fn inside_rings(rings: &[Ring], x: f64, y: f64) -> bool {
    rings
        .iter()
        .fold(false, |inside, ring| inside ^ crosses_odd(ring, x, y))
}

/// Crossing-number test for one ring.
fn crosses_odd(ring: &Ring, x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = ring.len();
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
