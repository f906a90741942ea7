//! # canopy-store
//!
//! Filesystem layer for canopy runs.
//!
//! This crate provides:
//! - `FsRasterStore`: the kernel's `RasterStore` over JSON and ESRI ASCII grids
//! - GeoJSON vector-mask loading
//! - `RunConfig` (TOML) and standalone JSON rule files
//! - Run manifests with SHA-256 output digests
//!
//! All writes go through a temp file and a rename, so a crashed run never
//! leaves a truncated raster behind.
//!
//! ## Data model
//!
//! ```text
//! canopy.toml ─→ RunConfig ─→ Layout / LayerRoles / RuleSet / RunOptions
//! mask.geojson ─→ FeatureCollection
//! *.json | *.asc ⇄ FsRasterStore ⇄ Grid
//! ```

pub mod ascii_grid;
pub mod atomic;
pub mod config;
pub mod error;
pub mod json_grid;
pub mod manifest;
pub mod raster;
pub mod rules;
pub mod vector;

pub use atomic::{read_text, write_atomic};
pub use config::{ChecksConfig, LayersConfig, PathsConfig, PctConfig, RunConfig};
pub use error::StoreError;
pub use manifest::{MANIFEST_FILE, Manifest, ManifestEntry, build_manifest, sha256_hex, write_manifest};
pub use raster::{FsRasterStore, RasterFormat};
pub use rules::{load_rules_json, parse_rules_json};
pub use vector::{load_vector_mask, parse_feature_collection};
