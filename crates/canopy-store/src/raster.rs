//! Filesystem raster store: dispatches on file extension to a codec.

use crate::atomic::{read_text, write_atomic};
use crate::error::StoreError;
use crate::{ascii_grid, json_grid};
use canopy_kernel::{Grid, RasterStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    JsonGrid,
    EsriAscii,
}

impl RasterFormat {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(RasterFormat::JsonGrid),
            Some("asc") => Ok(RasterFormat::EsriAscii),
            _ => Err(StoreError::UnsupportedRasterFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Rasters on disk. Relative paths resolve against `root`.
#[derive(Debug, Clone)]
pub struct FsRasterStore {
    root: PathBuf,
}

impl Default for FsRasterStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FsRasterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn read_grid(&self, path: &Path) -> Result<Grid, StoreError> {
        let full = self.resolve(path);
        let format = RasterFormat::from_path(&full)?;
        let text = read_text(&full)?;
        match format {
            RasterFormat::JsonGrid => json_grid::decode(&full, &text),
            RasterFormat::EsriAscii => {
                let mut grid = ascii_grid::decode(&full, &text)?;
                grid.crs = read_prj(&full)?;
                Ok(grid)
            }
        }
    }

    pub fn write_grid(&self, path: &Path, grid: &Grid) -> Result<(), StoreError> {
        let full = self.resolve(path);
        match RasterFormat::from_path(&full)? {
            RasterFormat::JsonGrid => write_atomic(&full, json_grid::encode(&full, grid)?.as_bytes()),
            RasterFormat::EsriAscii => {
                write_atomic(&full, ascii_grid::encode(&full, grid)?.as_bytes())?;
                let prj = full.with_extension("prj");
                match &grid.crs {
                    Some(crs) => write_atomic(&prj, format!("{crs}\n").as_bytes()),
                    None => remove_stale(&prj),
                }
            }
        }
    }
}

/// A grid without a CRS must not inherit a sidecar from an earlier write.
fn remove_stale(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn read_prj(grid_path: &Path) -> Result<Option<String>, StoreError> {
    let prj = grid_path.with_extension("prj");
    if !prj.is_file() {
        return Ok(None);
    }
    let text = read_text(&prj)?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

impl RasterStore for FsRasterStore {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &Path) -> canopy_kernel::Result<Grid> {
        Ok(self.read_grid(path)?)
    }

    fn write(&mut self, path: &Path, grid: &Grid) -> canopy_kernel::Result<()> {
        self.write_grid(path, grid)?;
        tracing::debug!(path = %self.resolve(path).display(), "raster written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use canopy_kernel::{CanopyError, GeoTransform};

    fn sample() -> Grid {
        Grid::new(
            2,
            1,
            GeoTransform::north_up(0.0, 1.0, 1.0, 1.0),
            Some(-9999.0),
            vec![0.5, -9999.0],
        )
        .unwrap()
        .with_crs("EPSG:3035")
    }

    #[test]
    fn json_and_ascii_grids_round_trip_through_disk() {
        let dir = temp_dir("raster");
        let mut store = FsRasterStore::new(&dir);
        for name in ["out/IMD_pct.json", "out/IMD_pct.asc"] {
            let path = Path::new(name);
            store.write(path, &sample()).expect("write should succeed");
            assert!(store.exists(path));
            assert_eq!(store.read(path).expect("read should succeed"), sample());
        }
        assert_eq!(
            fs::read_to_string(dir.join("out/IMD_pct.prj")).expect("prj written"),
            "EPSG:3035\n"
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn ascii_write_without_crs_drops_old_sidecar() {
        let dir = temp_dir("raster-prj");
        let mut store = FsRasterStore::new(&dir);
        let path = Path::new("IMD_mask.asc");
        store.write(path, &sample()).expect("first write");
        assert!(dir.join("IMD_mask.prj").is_file());

        let mut bare = sample();
        bare.crs = None;
        store.write(path, &bare).expect("second write");
        assert!(!dir.join("IMD_mask.prj").exists());
        assert_eq!(store.read(path).expect("read").crs, None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_extension_and_missing_file_are_storage_errors() {
        let dir = temp_dir("raster-errors");
        let store = FsRasterStore::new(&dir);
        assert!(matches!(
            store.read(Path::new("IMD.tif")),
            Err(CanopyError::Storage(message)) if message.contains("unsupported raster format")
        ));
        assert!(!store.exists(Path::new("IMD.json")));
        assert!(matches!(
            store.read(Path::new("IMD.json")),
            Err(CanopyError::Storage(_))
        ));
        let _ = fs::remove_dir_all(dir);
    }
}
