//! Error types for canopy kernel operations.

use serde::{Deserialize, Serialize};

/// One offending (layer, value) pair inside a bounds violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerValue {
    pub layer: String,
    pub value: f64,
}

/// Errors arising from rule-set misuse, mask-constraint violations, or
/// malformed inputs at the raster/vector boundary.
///
/// Every variant is fatal for the current run.
#[derive(Debug, thiserror::Error)]
pub enum CanopyError {
    /// The distinct rule tokens do not form a legal processing mode.
    #[error("invalid rule combination {found:?}: {reason}")]
    InvalidRuleCombination { found: Vec<String>, reason: String },

    /// A MASK-mode attribute could not be read as a number.
    #[error("feature {feature_id}: attribute '{layer}' has non-convertible value {value}")]
    ValueCoercion {
        feature_id: String,
        layer: String,
        value: String,
    },

    /// One or more MASK-mode values fall outside [0, 1].
    #[error("feature {feature_id}: values outside [0,1]: {}", render_layer_values(.violations))]
    BoundsViolation {
        feature_id: String,
        violations: Vec<LayerValue>,
    },

    /// An attribute required by the ordering relationship is absent.
    #[error("feature {feature_id}: required attribute '{layer}' is missing")]
    MissingAttribute { feature_id: String, layer: String },

    /// The upper scalar layer is below the lower scalar layer.
    #[error("feature {feature_id}: {upper_layer}={upper} < {lower_layer}={lower}")]
    OrderingViolation {
        feature_id: String,
        upper_layer: String,
        upper: f64,
        lower_layer: String,
        lower: f64,
    },

    /// Fraction attributes of a feature do not sum to one.
    #[error("feature {feature_id}: fraction sum = {sum} != 1.0")]
    SumConstraintViolation { feature_id: String, sum: f64 },

    /// Unrecognized out-of-range remediation policy.
    #[error("invalid exceed handling '{0}': use 'clip', 'normalize', or 'ignore'")]
    InvalidExceedHandling(String),

    /// Unrecognized zero-value policy.
    #[error("invalid zero handling '{0}': use 'raise' or 'preserve'")]
    InvalidZeroHandling(String),

    /// Fraction grids do not share shape and transform.
    #[error("grid mismatch between '{reference}' and '{layer}': {detail}")]
    GridMismatch {
        reference: String,
        layer: String,
        detail: String,
    },

    /// A grid whose buffer does not agree with its declared shape.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A feature geometry the rasterizer cannot burn.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Raster or vector boundary failure.
    #[error("storage error: {0}")]
    Storage(String),
}

fn render_layer_values(values: &[LayerValue]) -> String {
    values
        .iter()
        .map(|lv| format!("{}={}", lv.layer, lv.value))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = CanopyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_violation_lists_every_layer() {
        let err = CanopyError::BoundsViolation {
            feature_id: "3".to_string(),
            violations: vec![
                LayerValue {
                    layer: "F_AC".to_string(),
                    value: 1.5,
                },
                LayerValue {
                    layer: "IMD".to_string(),
                    value: -0.2,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("feature 3"));
        assert!(message.contains("F_AC=1.5"));
        assert!(message.contains("IMD=-0.2"));
    }
}
