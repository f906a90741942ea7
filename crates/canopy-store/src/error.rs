//! Errors at the filesystem boundary.

use canopy_kernel::CanopyError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("{path}: unsupported raster format (expected .json or .asc)")]
    UnsupportedRasterFormat { path: String },

    #[error("{path}: unsupported vector format '{extension}' (only GeoJSON is readable)")]
    UnsupportedVectorFormat { path: String, extension: String },

    #[error("{path}: cannot encode grid: {message}")]
    Encode { path: String, message: String },

    #[error("corrupted file: {0}")]
    Corrupt(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Kernel(#[from] CanopyError),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        StoreError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for CanopyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Kernel(inner) => inner,
            other => CanopyError::Storage(other.to_string()),
        }
    }
}
