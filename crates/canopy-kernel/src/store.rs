//! Raster source/sink boundary.

use crate::error::{CanopyError, Result};
use crate::grid::Grid;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Opens, reads and writes single-band grids by path.
///
/// Each call is a scoped acquisition: a read returns the whole grid in
/// memory, a write persists it in one go.
pub trait RasterStore {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<Grid>;
    fn write(&mut self, path: &Path, grid: &Grid) -> Result<()>;
}

/// In-memory store keyed by path. Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryRasterStore {
    grids: BTreeMap<PathBuf, Grid>,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, grid: Grid) {
        self.grids.insert(path.into(), grid);
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.grids.keys().map(PathBuf::as_path)
    }
}

impl RasterStore for MemoryRasterStore {
    fn exists(&self, path: &Path) -> bool {
        self.grids.contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Grid> {
        self.grids
            .get(path)
            .cloned()
            .ok_or_else(|| CanopyError::Storage(format!("{}: no such raster", path.display())))
    }

    fn write(&mut self, path: &Path, grid: &Grid) -> Result<()> {
        grid.check_shape()?;
        self.grids.insert(path.to_path_buf(), grid.clone());
        Ok(())
    }
}
