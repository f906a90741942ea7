//! Layer naming: extension normalization and fraction/scalar tagging.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raster file extensions stripped from rule keys.
pub const RASTER_EXTENSIONS: &[&str] = &[".tif", ".tiff", ".json", ".asc"];

pub const DEFAULT_FRACTION_PREFIX: &str = "F_";
pub const DEFAULT_UPPER_LAYER: &str = "IMD";
pub const DEFAULT_LOWER_LAYER: &str = "BSF";

/// A layer name with any raster extension removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerName(String);

impl LayerName {
    /// Normalize a rule key such as `F_AC.tif` or `IMD` into a layer name.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        for ext in RASTER_EXTENSIONS {
            if trimmed.len() > ext.len() && trimmed.to_ascii_lowercase().ends_with(ext) {
                return Self(trimmed[..trimmed.len() - ext.len()].to_string());
            }
        }
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerName {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

/// Whether a layer belongs to the sum-to-one fraction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Fraction,
    Scalar,
}

/// Naming conventions that give layers their domain roles.
///
/// `upper` and `lower` name the two scalar layers bound by the
/// `upper >= lower` relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRoles {
    pub fraction_prefix: String,
    pub upper: LayerName,
    pub lower: LayerName,
}

impl Default for LayerRoles {
    fn default() -> Self {
        Self {
            fraction_prefix: DEFAULT_FRACTION_PREFIX.to_string(),
            upper: LayerName::normalize(DEFAULT_UPPER_LAYER),
            lower: LayerName::normalize(DEFAULT_LOWER_LAYER),
        }
    }
}

impl LayerRoles {
    pub fn kind_of(&self, layer: &LayerName) -> LayerKind {
        if layer.as_str().starts_with(&self.fraction_prefix) {
            LayerKind::Fraction
        } else {
            LayerKind::Scalar
        }
    }

    pub fn is_fraction(&self, layer: &LayerName) -> bool {
        self.kind_of(layer) == LayerKind::Fraction
    }
}
