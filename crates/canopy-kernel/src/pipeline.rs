//! Run orchestration over rule layers.
//!
//! ```text
//! classify ─┬─ NONE ──────────────────────────── nothing written
//!           ├─ MASK ── validate ── mask every layer ── write all
//!           └─ PCT / PCT_WITH_NONE
//!                 ├─ fraction layers ── joint adjust ── write each
//!                 └─ scalar layers ──── one by one (missing → skip)
//! ```

use crate::classify::{RuleClass, classify};
use crate::consistency::{ConsistencyReport, check_consistency};
use crate::crs::{CrsReport, check_crs_match};
use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::feature::FeatureCollection;
use crate::fraction::{FractionLayer, apply_pct_fractions};
use crate::grid::Grid;
use crate::layer::{LayerName, LayerRoles};
use crate::mask::apply_masking;
use crate::pct::{PctOptions, apply_pct_scalar};
use crate::rasterize::Rasterizer;
use crate::rule::{Rule, RuleSet};
use crate::store::RasterStore;
use crate::validate::validate_mask_features;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MASK_SUFFIX: &str = "mask";
pub const PCT_SUFFIX: &str = "pct";

/// Where layer rasters are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub ucp_dir: PathBuf,
    pub fractions_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Raster file extension without the dot.
    pub extension: String,
}

impl Layout {
    pub fn new(
        ucp_dir: impl Into<PathBuf>,
        fractions_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            ucp_dir: ucp_dir.into(),
            fractions_dir: fractions_dir.into(),
            output_dir: output_dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Input raster: fraction layers live in the fractions folder,
    /// everything else in the UCP folder.
    pub fn source(&self, roles: &LayerRoles, layer: &LayerName) -> PathBuf {
        let dir = if roles.is_fraction(layer) {
            &self.fractions_dir
        } else {
            &self.ucp_dir
        };
        dir.join(format!("{layer}.{}", self.extension))
    }

    /// Output raster: `<layer>_<suffix>.<ext>` in the output folder.
    pub fn output(&self, layer: &LayerName, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{layer}_{suffix}.{}", self.extension))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub pct: PctOptions,
    pub check_crs: bool,
    pub check_consistency: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pct: PctOptions::default(),
            check_crs: true,
            check_consistency: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenOutput {
    pub layer: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PctOutcome {
    pub outputs: Vec<WrittenOutput>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub class: RuleClass,
    pub outputs: Vec<WrittenOutput>,
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencyReport>,
}

/// Everything one run needs: where rasters live, how layers are named,
/// how polygons are burned, and where grids and diagnostics go.
pub struct Pipeline<'a> {
    pub layout: Layout,
    pub roles: LayerRoles,
    pub rasterizer: &'a dyn Rasterizer,
    pub store: &'a mut dyn RasterStore,
    pub sink: &'a mut dyn EventSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        layout: Layout,
        roles: LayerRoles,
        rasterizer: &'a dyn Rasterizer,
        store: &'a mut dyn RasterStore,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            layout,
            roles,
            rasterizer,
            store,
            sink,
        }
    }

    pub fn check_crs(&mut self, features: &FeatureCollection, rules: &RuleSet) -> CrsReport {
        check_crs_match(
            features.crs.as_deref(),
            rules,
            &self.roles,
            &self.layout,
            &*self.store,
            &mut *self.sink,
        )
    }

    /// Mask every `mask` layer. All outputs are computed before the first
    /// write, so a failing layer leaves nothing behind.
    pub fn apply_mask_rule_all(
        &mut self,
        features: &FeatureCollection,
        rules: &RuleSet,
    ) -> Result<Vec<WrittenOutput>> {
        let mut pending = Vec::new();
        for (layer, _) in rules.iter().filter(|(_, rule)| *rule == Rule::Mask) {
            let grid = self.store.read(&self.layout.source(&self.roles, layer))?;
            let masked = apply_masking(grid, features, layer, self.rasterizer, &mut *self.sink)?;
            pending.push((layer.clone(), self.layout.output(layer, MASK_SUFFIX), masked));
        }
        pending
            .into_iter()
            .map(|(layer, path, grid)| self.write_output(&layer, path, &grid))
            .collect()
    }

    /// Jointly adjust every fraction layer in `rules` and write each to
    /// `<layer>_pct`.
    pub fn apply_pct_all_fractions(
        &mut self,
        features: &FeatureCollection,
        rules: &RuleSet,
    ) -> Result<Vec<WrittenOutput>> {
        let (fractions, _) = rules.split(&self.roles);
        if fractions.is_empty() {
            return Ok(Vec::new());
        }

        let mut layers = Vec::with_capacity(fractions.len());
        for (layer, rule) in fractions.iter() {
            let grid = self.store.read(&self.layout.source(&self.roles, layer))?;
            layers.push(FractionLayer::new(layer.clone(), rule, grid));
        }

        let adjusted = apply_pct_fractions(layers, features, self.rasterizer, &mut *self.sink)?;
        adjusted
            .into_iter()
            .map(|layer| {
                let path = self.layout.output(&layer.name, PCT_SUFFIX);
                self.write_output(&layer.name, path, &layer.grid)
            })
            .collect()
    }

    /// Percentage mode: fraction layers as one batch, scalar layers one at
    /// a time. A scalar layer without a source raster is skipped.
    pub fn apply_pct_all(
        &mut self,
        features: &FeatureCollection,
        rules: &RuleSet,
        options: &PctOptions,
    ) -> Result<PctOutcome> {
        let rules = rules.filtered(|rule| matches!(rule, Rule::Pct | Rule::None));
        let (fractions, scalars) = rules.split(&self.roles);

        let mut outcome = PctOutcome {
            outputs: self.apply_pct_all_fractions(features, &fractions)?,
            skipped: Vec::new(),
        };

        for (layer, rule) in scalars.iter() {
            let source = self.layout.source(&self.roles, layer);
            if !self.store.exists(&source) {
                self.sink.emit(Event::RasterMissing {
                    layer: layer.to_string(),
                    path: source.display().to_string(),
                });
                outcome.skipped.push(layer.to_string());
                continue;
            }
            let grid = self.store.read(&source)?;
            let adjusted = apply_pct_scalar(
                grid,
                features,
                layer,
                rule,
                options,
                self.rasterizer,
                &mut *self.sink,
            )?;
            let path = self.layout.output(layer, PCT_SUFFIX);
            outcome.outputs.push(self.write_output(layer, path, &adjusted)?);
        }
        Ok(outcome)
    }

    /// Compare the adjusted upper and lower layers written with `suffix`.
    pub fn check_consistency(&mut self, suffix: &str) -> ConsistencyReport {
        let upper = self.read_optional(&self.layout.output(&self.roles.upper, suffix));
        let lower = self.read_optional(&self.layout.output(&self.roles.lower, suffix));
        check_consistency(upper.as_ref(), lower.as_ref(), &mut *self.sink)
    }

    /// Classify, gate, and dispatch one run.
    pub fn run(
        &mut self,
        features: &FeatureCollection,
        rules: &RuleSet,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let crs = options
            .check_crs
            .then(|| self.check_crs(features, rules));
        let classification = classify(rules, &mut *self.sink)?;

        let (outputs, skipped, suffix) = match classification.class {
            RuleClass::None => (Vec::new(), Vec::new(), None),
            RuleClass::Mask => {
                validate_mask_features(features, rules, &self.roles, &mut *self.sink)?;
                (
                    self.apply_mask_rule_all(features, rules)?,
                    Vec::new(),
                    Some(MASK_SUFFIX),
                )
            }
            RuleClass::Pct | RuleClass::PctWithNone => {
                let outcome = self.apply_pct_all(features, rules, &options.pct)?;
                (outcome.outputs, outcome.skipped, Some(PCT_SUFFIX))
            }
        };

        let consistency = match suffix {
            Some(suffix) if options.check_consistency => Some(self.check_consistency(suffix)),
            _ => None,
        };

        Ok(RunSummary {
            class: classification.class,
            outputs,
            skipped,
            crs,
            consistency,
        })
    }

    fn read_optional(&self, path: &Path) -> Option<Grid> {
        if !self.store.exists(path) {
            return None;
        }
        self.store.read(path).ok()
    }

    fn write_output(
        &mut self,
        layer: &LayerName,
        path: PathBuf,
        grid: &Grid,
    ) -> Result<WrittenOutput> {
        self.store.write(&path, grid)?;
        self.sink.emit(Event::OutputWritten {
            layer: layer.to_string(),
            path: path.display().to_string(),
        });
        Ok(WrittenOutput {
            layer: layer.to_string(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::feature::{Feature, Polygon};
    use crate::grid::GeoTransform;
    use crate::rasterize::CenterRasterizer;
    use crate::store::MemoryRasterStore;

    #[test]
    fn layout_routes_by_prefix_and_suffix() {
        let layout = Layout::new("ucp", "fractions", "out", ".json");
        let roles = LayerRoles::default();
        assert_eq!(
            layout.source(&roles, &"F_AC".into()),
            PathBuf::from("fractions/F_AC.json")
        );
        assert_eq!(
            layout.source(&roles, &"IMD.tif".into()),
            PathBuf::from("ucp/IMD.json")
        );
        assert_eq!(
            layout.output(&"IMD".into(), PCT_SUFFIX),
            PathBuf::from("out/IMD_pct.json")
        );
    }

    #[test]
    fn mask_failure_writes_nothing() {
        let mut store = MemoryRasterStore::new();
        store.insert(
            "ucp/IMD.json",
            Grid::filled(2, 2, GeoTransform::north_up(0.0, 2.0, 1.0, 1.0), 0.1).unwrap(),
        );
        // BSF raster is missing: the second layer fails after IMD was masked.
        let rules = RuleSet::parse([("IMD", "mask"), ("BSF", "mask")]).unwrap();
        let features = FeatureCollection::new(vec![
            Feature::new("0", Polygon::rect(-1.0, -1.0, 3.0, 3.0))
                .with("IMD", 0.5)
                .with("BSF", 0.4),
        ]);
        let mut log = EventLog::new();
        let err = {
            let mut pipeline = Pipeline::new(
                Layout::new("ucp", "fractions", "out", "json"),
                LayerRoles::default(),
                &CenterRasterizer,
                &mut store,
                &mut log,
            );
            pipeline.apply_mask_rule_all(&features, &rules).unwrap_err()
        };
        assert!(matches!(err, crate::CanopyError::Storage(_)));
        assert!(!store.exists(Path::new("out/IMD_mask.json")));
    }
}
