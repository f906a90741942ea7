//! Mask-constraint gate.
//!
//! Runs before any raster is touched in MASK mode. Per feature, in order:
//!
//! 1. coerce every present rule-layer attribute to a number
//! 2. bounds: all values in [0, 1] (violations batched per feature)
//! 3. ordering: `upper >= lower`, both required
//! 4. sum: fraction attributes sum to 1 within tolerance
//!
//! The first failing feature aborts the whole run.

use crate::error::{CanopyError, LayerValue, Result};
use crate::events::{Event, EventSink};
use crate::feature::{Feature, FeatureCollection};
use crate::layer::{LayerName, LayerRoles};
use crate::rule::RuleSet;

/// Relative tolerance of the fraction-sum comparison.
pub const SUM_RTOL: f64 = 1e-5;
/// Absolute tolerance of the fraction-sum comparison.
pub const SUM_ATOL: f64 = 1e-8;

/// `|a - b| <= atol + rtol * |b|`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= SUM_ATOL + SUM_RTOL * b.abs()
}

pub fn validate_mask_features(
    features: &FeatureCollection,
    rules: &RuleSet,
    roles: &LayerRoles,
    sink: &mut dyn EventSink,
) -> Result<()> {
    let (fractions, scalars) = rules.split(roles);
    let fraction_layers: Vec<&LayerName> = fractions.layers().collect();
    let scalar_layers: Vec<&LayerName> = scalars.layers().collect();

    for feature in features.iter() {
        validate_feature(feature, &fraction_layers, &scalar_layers, roles, sink)?;
    }
    Ok(())
}

fn validate_feature(
    feature: &Feature,
    fraction_layers: &[&LayerName],
    scalar_layers: &[&LayerName],
    roles: &LayerRoles,
    sink: &mut dyn EventSink,
) -> Result<()> {
    let fraction_values = present_values(feature, fraction_layers)?;
    let scalar_values = present_values(feature, scalar_layers)?;

    let violations: Vec<LayerValue> = fraction_values
        .iter()
        .chain(&scalar_values)
        .filter(|lv| !(0.0..=1.0).contains(&lv.value))
        .cloned()
        .collect();
    if !violations.is_empty() {
        return Err(CanopyError::BoundsViolation {
            feature_id: feature.id.clone(),
            violations,
        });
    }

    let upper = required(feature, &roles.upper)?;
    let lower = required(feature, &roles.lower)?;
    if upper < lower {
        return Err(CanopyError::OrderingViolation {
            feature_id: feature.id.clone(),
            upper_layer: roles.upper.to_string(),
            upper,
            lower_layer: roles.lower.to_string(),
            lower,
        });
    }

    // Vacuous when the rule set names no fraction layers.
    let fraction_sum = if fraction_layers.is_empty() {
        None
    } else {
        let sum: f64 = fraction_values.iter().map(|lv| lv.value).sum();
        if !is_close(sum, 1.0) {
            return Err(CanopyError::SumConstraintViolation {
                feature_id: feature.id.clone(),
                sum,
            });
        }
        Some(sum)
    };

    sink.emit(Event::FeatureValidated {
        feature_id: feature.id.clone(),
        upper,
        lower,
        fraction_sum,
    });
    Ok(())
}

fn present_values(feature: &Feature, layers: &[&LayerName]) -> Result<Vec<LayerValue>> {
    let mut values = Vec::new();
    for layer in layers {
        if let Some(value) = feature.number(layer)? {
            values.push(LayerValue {
                layer: layer.to_string(),
                value,
            });
        }
    }
    Ok(values)
}

fn required(feature: &Feature, layer: &LayerName) -> Result<f64> {
    match feature.number(layer)? {
        Some(value) if !value.is_nan() => Ok(value),
        _ => Err(CanopyError::MissingAttribute {
            feature_id: feature.id.clone(),
            layer: layer.to_string(),
        }),
    }
}
