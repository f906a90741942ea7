//! Joint percentage adjustment of the fraction family.
//!
//! Fraction layers must sum to one per pixel, so they are scaled together
//! and renormalized inside each polygon rather than one layer at a time.

use crate::error::{CanopyError, Result};
use crate::events::{Event, EventSink};
use crate::feature::{Feature, FeatureCollection};
use crate::grid::{Grid, select_valid};
use crate::layer::LayerName;
use crate::mask::report_nodata;
use crate::pct::factor_for;
use crate::rasterize::Rasterizer;
use crate::rule::Rule;

/// One member of the fraction stack.
#[derive(Debug, Clone, PartialEq)]
pub struct FractionLayer {
    pub name: LayerName,
    pub rule: Rule,
    pub grid: Grid,
}

impl FractionLayer {
    pub fn new(name: impl Into<LayerName>, rule: Rule, grid: Grid) -> Self {
        Self {
            name: name.into(),
            rule,
            grid,
        }
    }
}

/// Check every layer shares the first layer's shape and transform.
pub fn check_footing(layers: &[FractionLayer]) -> Result<()> {
    let Some(reference) = layers.first() else {
        return Ok(());
    };
    for layer in &layers[1..] {
        layer.grid.check_shape()?;
        if reference.grid.same_footing(&layer.grid) {
            continue;
        }
        let detail = if reference.grid.shape() != layer.grid.shape() {
            format!(
                "shape {:?} vs {:?}",
                reference.grid.shape(),
                layer.grid.shape()
            )
        } else {
            "transforms differ".to_string()
        };
        return Err(CanopyError::GridMismatch {
            reference: reference.name.to_string(),
            layer: layer.name.to_string(),
            detail,
        });
    }
    Ok(())
}

/// Scale each fraction layer by its feature percentage, then divide every
/// selected pixel by the stack sum so the family sums to one inside the
/// footprint.
///
/// Overlapping features compose: each feature renormalizes the output of
/// the previous one. A pixel whose scaled sum is zero stays zero. NoData
/// is taken from the first layer and restored, with the first layer's
/// sentinel, in every output layer.
pub fn apply_pct_fractions(
    layers: Vec<FractionLayer>,
    features: &FeatureCollection,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Vec<FractionLayer>> {
    if layers.is_empty() {
        return Ok(layers);
    }
    layers[0].grid.check_shape()?;
    check_footing(&layers)?;

    let reference = &layers[0];
    report_nodata(&reference.name, &reference.grid, sink);
    let nodata = reference.grid.nodata;
    let nodata_mask = reference.grid.nodata_mask();

    let mut layers = features.iter().try_fold(layers, |layers, feature| {
        fraction_step(layers, feature, nodata_mask.as_deref(), rasterizer, sink)
    })?;

    for layer in &mut layers {
        layer.grid.nodata = nodata;
        if let Some(mask) = &nodata_mask {
            layer.grid.restore_nodata(mask);
        }
    }
    Ok(layers)
}

fn fraction_step(
    mut layers: Vec<FractionLayer>,
    feature: &Feature,
    nodata_mask: Option<&[bool]>,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Vec<FractionLayer>> {
    let footprint = rasterizer.footprint_on(&feature.geometry, &layers[0].grid)?;
    let selected = select_valid(&footprint, nodata_mask);
    if selected.is_empty() {
        sink.emit(Event::FootprintEmpty {
            feature_id: feature.id.clone(),
        });
        return Ok(layers);
    }

    let mut factors = Vec::with_capacity(layers.len());
    for layer in &layers {
        let (pct, factor) = factor_for(feature, &layer.name, layer.rule)?;
        sink.emit(Event::PctFactor {
            layer: layer.name.to_string(),
            feature_id: feature.id.clone(),
            pct,
            factor,
        });
        factors.push(factor);
    }

    let mut sums = Vec::with_capacity(selected.len());
    for &idx in &selected {
        let mut sum = 0.0;
        for (layer, factor) in layers.iter_mut().zip(&factors) {
            let value = &mut layer.grid.values[idx];
            *value *= factor;
            sum += *value;
        }
        let divisor = if sum == 0.0 { 1.0 } else { sum };
        let mut normalized = 0.0;
        for layer in layers.iter_mut() {
            let value = &mut layer.grid.values[idx];
            *value /= divisor;
            normalized += *value;
        }
        sums.push(normalized);
    }

    let (min, max) = sums
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });
    sink.emit(Event::FractionSums {
        feature_id: feature.id.clone(),
        pixels: sums.len(),
        min,
        max,
        mean: sums.iter().sum::<f64>() / sums.len() as f64,
    });
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, Silent};
    use crate::feature::Polygon;
    use crate::grid::GeoTransform;
    use crate::rasterize::CenterRasterizer;

    fn transform() -> GeoTransform {
        GeoTransform::north_up(0.0, 2.0, 1.0, 1.0)
    }

    fn grid(values: Vec<f64>) -> Grid {
        Grid::new(2, 2, transform(), Some(-9999.0), values).unwrap()
    }

    fn everywhere(id: &str) -> Feature {
        Feature::new(id, Polygon::rect(-1.0, -1.0, 3.0, 3.0))
    }

    fn left_column(id: &str) -> Feature {
        Feature::new(id, Polygon::rect(-1.0, -1.0, 1.0, 3.0))
    }

    fn stack_sum(layers: &[FractionLayer], idx: usize) -> f64 {
        layers.iter().map(|layer| layer.grid.values[idx]).sum()
    }

    #[test]
    fn renormalizes_after_scaling() {
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.6; 4])),
            FractionLayer::new("F_B", Rule::Pct, grid(vec![0.4; 4])),
        ];
        let features =
            FeatureCollection::new(vec![everywhere("0").with("F_A", 50.0).with("F_B", 0.0)]);
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut Silent).unwrap();
        for idx in 0..4 {
            assert!((out[0].grid.values[idx] - 0.9 / 1.3).abs() < 1e-9);
            assert!((out[1].grid.values[idx] - 0.4 / 1.3).abs() < 1e-9);
            assert!((stack_sum(&out, idx) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn none_layers_still_renormalize() {
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.2; 4])),
            FractionLayer::new("F_B", Rule::None, grid(vec![0.2; 4])),
            FractionLayer::new("F_C", Rule::None, grid(vec![0.1; 4])),
        ];
        // F_B carries an attribute, but its rule is none.
        let features = FeatureCollection::new(vec![
            left_column("0").with("F_A", -50.0).with("F_B", 300.0),
        ]);
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut Silent).unwrap();
        // Inside: 0.1, 0.2, 0.1 -> /0.4.
        assert!((out[0].grid.values[0] - 0.25).abs() < 1e-12);
        assert!((out[1].grid.values[0] - 0.5).abs() < 1e-12);
        assert!((stack_sum(&out, 2) - 1.0).abs() < 1e-6);
        // Outside the footprint the input (sum 0.5) is untouched.
        assert_eq!(out[0].grid.values[1], 0.2);
        assert!((stack_sum(&out, 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_pixels_stay_zero() {
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.0, 0.5, 0.0, 0.5])),
            FractionLayer::new("F_B", Rule::Pct, grid(vec![0.0, 0.5, 0.0, 0.5])),
        ];
        let features = FeatureCollection::new(vec![everywhere("0").with("F_A", 20.0)]);
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut Silent).unwrap();
        assert_eq!(out[0].grid.values[0], 0.0);
        assert_eq!(out[1].grid.values[0], 0.0);
        assert!(!out[0].grid.values[0].is_nan());
        assert!((stack_sum(&out, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn overlapping_features_compose_sequentially() {
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.5; 4])),
            FractionLayer::new("F_B", Rule::Pct, grid(vec![0.5; 4])),
        ];
        let features = FeatureCollection::new(vec![
            everywhere("0").with("F_A", 100.0),
            left_column("1").with("F_A", 100.0),
        ]);
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut Silent).unwrap();
        // First step: 1.0/0.5 -> 2/3, 1/3. Second: 4/3, 1/3 -> 0.8, 0.2.
        assert!((out[0].grid.values[0] - 0.8).abs() < 1e-12);
        assert!((out[0].grid.values[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn nodata_from_first_layer_is_restored_everywhere() {
        let first = grid(vec![0.6, -9999.0, 0.6, 0.6]);
        let second = Grid::new(2, 2, transform(), Some(-1.0), vec![0.4, 0.4, 0.4, 0.4]).unwrap();
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, first),
            FractionLayer::new("F_B", Rule::Pct, second),
        ];
        let features = FeatureCollection::new(vec![everywhere("0").with("F_B", 50.0)]);
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut Silent).unwrap();
        assert_eq!(out[0].grid.values[1], -9999.0);
        assert_eq!(out[1].grid.values[1], -9999.0);
        assert_eq!(out[1].grid.nodata, Some(-9999.0));
        assert!((stack_sum(&out, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_footprint_skips_feature() {
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.3; 4])),
            FractionLayer::new("F_B", Rule::Pct, grid(vec![0.3; 4])),
        ];
        let features = FeatureCollection::new(vec![
            Feature::new("far", Polygon::rect(50.0, 50.0, 60.0, 60.0)).with("F_A", 90.0),
        ]);
        let mut log = EventLog::new();
        let out = apply_pct_fractions(layers, &features, &CenterRasterizer, &mut log).unwrap();
        assert_eq!(out[0].grid.values, vec![0.3; 4]);
        assert!(log.events().contains(&Event::FootprintEmpty {
            feature_id: "far".to_string()
        }));
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let other = Grid::new(
            2,
            2,
            GeoTransform::north_up(10.0, 2.0, 1.0, 1.0),
            None,
            vec![0.5; 4],
        )
        .unwrap();
        let layers = vec![
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.5; 4])),
            FractionLayer::new("F_B", Rule::Pct, other),
        ];
        let err = apply_pct_fractions(
            layers,
            &FeatureCollection::default(),
            &CenterRasterizer,
            &mut Silent,
        )
        .unwrap_err();
        assert!(matches!(err, CanopyError::GridMismatch { ref layer, .. } if layer == "F_B"));

        let small = Grid::new(1, 1, transform(), None, vec![0.5]).unwrap();
        let err = check_footing(&[
            FractionLayer::new("F_A", Rule::Pct, grid(vec![0.5; 4])),
            FractionLayer::new("F_B", Rule::Pct, small),
        ])
        .unwrap_err();
        assert!(matches!(err, CanopyError::GridMismatch { ref detail, .. } if detail.starts_with("shape")));
    }
}
