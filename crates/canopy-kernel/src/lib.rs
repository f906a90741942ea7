//! # Canopy Kernel
//!
//! Rule-driven adjustment of land-cover rasters by polygon attributes.
//!
//! A run pairs a vector mask (polygons carrying per-layer attributes) with
//! a set of single-band rasters and a rule per layer. The rule set is
//! classified into one processing mode, then every raster is either
//! overwritten with attribute values (`mask`) or scaled by attribute
//! percentages (`pct`), with sum-to-one renormalization across the
//! fraction family.
//!
//! This crate is **storage-agnostic**: rasters arrive through the
//! [`RasterStore`] trait, polygons through [`Rasterizer`], diagnostics
//! leave through [`EventSink`].
//!
//! ## Architecture
//!
//! ```text
//! RuleSet               ← layer → {none, mask, pct}
//!     │
//! classify              ← NONE | MASK | PCT | PCT_WITH_NONE
//!     │
//! validate              ← MASK attribute constraints (bounds, order, sum)
//!     │
//! mask / pct / fraction ← per-pixel adjusters over a Footprint
//!     │
//! consistency           ← post-hoc upper >= lower report
//! ```

pub mod classify;
pub mod consistency;
pub mod crs;
pub mod error;
pub mod events;
pub mod feature;
pub mod fraction;
pub mod grid;
pub mod layer;
pub mod mask;
pub mod pct;
pub mod pipeline;
pub mod rasterize;
pub mod rule;
pub mod store;
pub mod validate;

pub use classify::{Classification, ClassificationInfo, RuleClass, classify};
pub use consistency::{ConsistencyReport, check_consistency};
pub use crs::{CrsMismatch, CrsReport, check_crs_match};
pub use error::{CanopyError, LayerValue, Result};
pub use events::{Event, EventLog, EventSink, Severity, Silent, Tee, TracingSink};
pub use feature::{Feature, FeatureCollection, Geometry, Polygon};
pub use fraction::{FractionLayer, apply_pct_fractions};
pub use grid::{Footprint, GeoTransform, Grid};
pub use layer::{LayerKind, LayerName, LayerRoles};
pub use mask::apply_masking;
pub use pct::{ExceedHandling, PctOptions, ZeroHandling, apply_pct_scalar};
pub use pipeline::{Layout, Pipeline, RunOptions, RunSummary, WrittenOutput};
pub use rasterize::{CenterRasterizer, Rasterizer};
pub use rule::{Rule, RuleSet};
pub use store::{MemoryRasterStore, RasterStore};
pub use validate::validate_mask_features;
