//! Direct-value masking: burn each feature's attribute into its footprint.

use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::feature::{Feature, FeatureCollection};
use crate::grid::Grid;
use crate::layer::LayerName;
use crate::rasterize::Rasterizer;

/// Report how many NoData cells a freshly read grid carries.
pub(crate) fn report_nodata(layer: &LayerName, grid: &Grid, sink: &mut dyn EventSink) {
    match grid.nodata_mask() {
        Some(mask) => sink.emit(Event::NoDataDetected {
            layer: layer.to_string(),
            count: mask.iter().filter(|&&flag| flag).count(),
        }),
        None => sink.emit(Event::NoDataUndefined {
            layer: layer.to_string(),
        }),
    }
}

/// Apply every feature's `layer` value to the cells under its footprint.
///
/// Features are folded in order, so the last feature covering a cell
/// wins. NoData cells are not protected: a footprint over NoData
/// overwrites it.
pub fn apply_masking(
    grid: Grid,
    features: &FeatureCollection,
    layer: &LayerName,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Grid> {
    grid.check_shape()?;
    report_nodata(layer, &grid, sink);
    features.iter().try_fold(grid, |grid, feature| {
        mask_step(grid, feature, layer, rasterizer, sink)
    })
}

fn mask_step(
    mut grid: Grid,
    feature: &Feature,
    layer: &LayerName,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Grid> {
    let Some(value) = feature.number(layer)? else {
        sink.emit(Event::MaskValueMissing {
            layer: layer.to_string(),
            feature_id: feature.id.clone(),
        });
        return Ok(grid);
    };
    let footprint = rasterizer.footprint_on(&feature.geometry, &grid)?;
    for idx in footprint.indices() {
        grid.values[idx] = value;
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, Silent};
    use crate::feature::Polygon;
    use crate::grid::GeoTransform;
    use crate::rasterize::CenterRasterizer;

    fn grid() -> Grid {
        Grid::new(
            2,
            2,
            GeoTransform::north_up(0.0, 2.0, 1.0, 1.0),
            Some(-9999.0),
            vec![0.1, 0.2, -9999.0, 0.4],
        )
        .unwrap()
    }

    #[test]
    fn full_cover_sets_every_cell() {
        let features = FeatureCollection::new(vec![
            Feature::new("0", Polygon::rect(-1.0, -1.0, 3.0, 3.0)).with("IMD", 0.7),
        ]);
        let out = apply_masking(
            grid(),
            &features,
            &"IMD".into(),
            &CenterRasterizer,
            &mut Silent,
        )
        .unwrap();
        assert_eq!(out.values, vec![0.7; 4]);
    }

    #[test]
    fn last_feature_wins_on_overlap() {
        let features = FeatureCollection::new(vec![
            Feature::new("0", Polygon::rect(-1.0, -1.0, 3.0, 3.0)).with("IMD", 0.3),
            // Left column only.
            Feature::new("1", Polygon::rect(-1.0, -1.0, 1.0, 3.0)).with("IMD", 0.9),
        ]);
        let out = apply_masking(
            grid(),
            &features,
            &"IMD".into(),
            &CenterRasterizer,
            &mut Silent,
        )
        .unwrap();
        assert_eq!(out.values, vec![0.9, 0.3, 0.9, 0.3]);
    }

    #[test]
    fn untouched_cells_keep_input_including_nodata() {
        let features = FeatureCollection::new(vec![
            // Top-right cell only.
            Feature::new("0", Polygon::rect(1.2, 1.2, 1.8, 1.8)).with("IMD", 0.5),
        ]);
        let out = apply_masking(
            grid(),
            &features,
            &"IMD".into(),
            &CenterRasterizer,
            &mut Silent,
        )
        .unwrap();
        assert_eq!(out.values, vec![0.1, 0.5, -9999.0, 0.4]);
    }

    #[test]
    fn missing_value_is_reported_and_skipped() {
        let features = FeatureCollection::new(vec![
            Feature::new("5", Polygon::rect(-1.0, -1.0, 3.0, 3.0)).with("BSF", 0.5),
        ]);
        let mut log = EventLog::new();
        let out = apply_masking(
            grid(),
            &features,
            &"IMD".into(),
            &CenterRasterizer,
            &mut log,
        )
        .unwrap();
        assert_eq!(out.values, grid().values);
        assert!(log.events().contains(&Event::NoDataDetected {
            layer: "IMD".to_string(),
            count: 1
        }));
        assert!(log.events().contains(&Event::MaskValueMissing {
            layer: "IMD".to_string(),
            feature_id: "5".to_string()
        }));
    }
}
