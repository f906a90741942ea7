//! Single-band raster grids, footprints, and pixel selection.

use crate::error::{CanopyError, Result};
use serde::{Deserialize, Serialize};

/// Affine georeferencing: `x = a·col + b·row + c`, `y = d·col + e·row + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// North-up transform with square-ish pixels anchored at the top-left corner.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: -pixel_height,
            f: origin_y,
        }
    }

    /// World coordinates of a (fractional) pixel position.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0 && self.a > 0.0 && self.e < 0.0
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::north_up(0.0, 0.0, 1.0, 1.0)
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }
}

impl From<GeoTransform> for [f64; 6] {
    fn from(t: GeoTransform) -> Self {
        [t.a, t.b, t.c, t.d, t.e, t.f]
    }
}

/// True when `value` is the NoData sentinel. A NaN sentinel matches NaN cells.
pub fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    match nodata {
        Some(sentinel) if sentinel.is_nan() => value.is_nan(),
        Some(sentinel) => value == sentinel,
        None => false,
    }
}

/// Cell count of a `width`×`height` raster, refusing sizes that overflow.
pub fn cell_count(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        CanopyError::InvalidGrid(format!("{width}x{height} grid is too large to address"))
    })
}

/// A row-major single-band grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    #[serde(default)]
    pub nodata: Option<f64>,
    #[serde(default)]
    pub crs: Option<String>,
    pub values: Vec<f64>,
}

impl Grid {
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        nodata: Option<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let grid = Self {
            width,
            height,
            transform,
            nodata,
            crs: None,
            values,
        };
        grid.check_shape()?;
        Ok(grid)
    }

    /// A grid filled with one value.
    pub fn filled(
        width: usize,
        height: usize,
        transform: GeoTransform,
        value: f64,
    ) -> Result<Self> {
        let cells = cell_count(width, height)?;
        Self::new(width, height, transform, None, vec![value; cells])
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn check_shape(&self) -> Result<()> {
        if self.values.len() != cell_count(self.width, self.height)? {
            return Err(CanopyError::InvalidGrid(format!(
                "{}x{} grid carries {} values",
                self.width,
                self.height,
                self.values.len()
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether two grids share shape and transform.
    pub fn same_footing(&self, other: &Grid) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.transform == other.transform
    }

    /// Per-cell NoData flags, or `None` when the grid declares no sentinel.
    pub fn nodata_mask(&self) -> Option<Vec<bool>> {
        self.nodata.map(|sentinel| {
            self.values
                .iter()
                .map(|&value| is_nodata(value, Some(sentinel)))
                .collect()
        })
    }

    /// Write the sentinel back into every flagged cell.
    pub fn restore_nodata(&mut self, mask: &[bool]) {
        if let Some(sentinel) = self.nodata {
            for (value, _) in self.values.iter_mut().zip(mask).filter(|(_, flag)| **flag) {
                *value = sentinel;
            }
        }
    }
}

/// Binary burn of one polygon onto a grid: `true` inside the footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    width: usize,
    cells: Vec<bool>,
}

impl Footprint {
    pub fn empty(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            width,
            cells: vec![false; cell_count(width, height)?],
        })
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Result<Self> {
        if cells.len() != cell_count(width, height)? {
            return Err(CanopyError::InvalidGrid(format!(
                "{width}x{height} footprint carries {} cells",
                cells.len()
            )));
        }
        Ok(Self { width, cells })
    }

    pub fn mark(&mut self, row: usize, col: usize) {
        self.cells[row * self.width + col] = true;
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, &cell)| cell.then_some(idx))
    }
}

/// Cells under a footprint that are not NoData.
///
/// Every adjuster that must leave NoData untouched goes through this one
/// selection; the direct-value masker alone writes the raw footprint.
pub fn select_valid(footprint: &Footprint, nodata_mask: Option<&[bool]>) -> Vec<usize> {
    footprint
        .indices()
        .filter(|&idx| nodata_mask.is_none_or(|mask| !mask[idx]))
        .collect()
}
