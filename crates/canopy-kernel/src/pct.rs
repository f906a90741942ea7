//! Single-layer percentage adjustment for scalar (UCP) layers.

use crate::error::{CanopyError, Result};
use crate::events::{Event, EventSink};
use crate::feature::{Feature, FeatureCollection};
use crate::grid::{Grid, select_valid};
use crate::layer::LayerName;
use crate::mask::report_nodata;
use crate::rasterize::Rasterizer;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ZERO_VALUE: f64 = 0.01;

/// Remediation applied when adjusted values leave [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceedHandling {
    /// Truncate to [0, 1].
    #[default]
    Clip,
    /// Rescale the observed range onto [0, 1].
    Normalize,
    /// Keep values as computed.
    Ignore,
}

impl ExceedHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            ExceedHandling::Clip => "clip",
            ExceedHandling::Normalize => "normalize",
            ExceedHandling::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ExceedHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceedHandling {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clip" => Ok(ExceedHandling::Clip),
            "normalize" => Ok(ExceedHandling::Normalize),
            "ignore" => Ok(ExceedHandling::Ignore),
            _ => Err(CanopyError::InvalidExceedHandling(s.to_string())),
        }
    }
}

/// Treatment of exact-zero cells before scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroHandling {
    /// Replace zeros under the footprint with the zero value, so growth applies.
    #[default]
    Raise,
    /// Leave zeros as zeros.
    Preserve,
}

impl ZeroHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            ZeroHandling::Raise => "raise",
            ZeroHandling::Preserve => "preserve",
        }
    }
}

impl fmt::Display for ZeroHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZeroHandling {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raise" => Ok(ZeroHandling::Raise),
            "preserve" => Ok(ZeroHandling::Preserve),
            _ => Err(CanopyError::InvalidZeroHandling(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PctOptions {
    pub exceed_handling: ExceedHandling,
    pub zero_handling: ZeroHandling,
    pub zero_value: f64,
}

impl Default for PctOptions {
    fn default() -> Self {
        Self {
            exceed_handling: ExceedHandling::Clip,
            zero_handling: ZeroHandling::Raise,
            zero_value: DEFAULT_ZERO_VALUE,
        }
    }
}

impl PctOptions {
    /// Build from policy tokens, failing on unknown ones.
    pub fn parse(exceed_handling: &str, zero_handling: &str, zero_value: f64) -> Result<Self> {
        Ok(Self {
            exceed_handling: exceed_handling.parse()?,
            zero_handling: zero_handling.parse()?,
            zero_value,
        })
    }
}

/// `1 + pct / 100`, with `none` layers fixed at 0%.
pub fn factor_for(feature: &Feature, layer: &LayerName, rule: Rule) -> Result<(f64, f64)> {
    let pct = match rule {
        Rule::Pct => feature.pct(layer)?,
        Rule::None | Rule::Mask => 0.0,
    };
    Ok((pct, 1.0 + pct / 100.0))
}

/// Scale the cells under each feature by its percentage, then bring the
/// result back into [0, 1] per `options.exceed_handling`.
///
/// Overlapping features compound: each step scales the output of the
/// previous one. NoData cells are never scaled and are restored to the
/// sentinel before returning.
pub fn apply_pct_scalar(
    grid: Grid,
    features: &FeatureCollection,
    layer: &LayerName,
    rule: Rule,
    options: &PctOptions,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Grid> {
    grid.check_shape()?;
    report_nodata(layer, &grid, sink);
    let nodata_mask = grid.nodata_mask();

    let mut grid = features.iter().try_fold(grid, |grid, feature| {
        pct_step(
            grid,
            feature,
            layer,
            rule,
            options,
            nodata_mask.as_deref(),
            rasterizer,
            sink,
        )
    })?;

    remediate(&mut grid, layer, options.exceed_handling, nodata_mask.as_deref(), sink);
    if let Some(mask) = &nodata_mask {
        grid.restore_nodata(mask);
    }
    Ok(grid)
}

#[allow(clippy::too_many_arguments)]
fn pct_step(
    mut grid: Grid,
    feature: &Feature,
    layer: &LayerName,
    rule: Rule,
    options: &PctOptions,
    nodata_mask: Option<&[bool]>,
    rasterizer: &dyn Rasterizer,
    sink: &mut dyn EventSink,
) -> Result<Grid> {
    let (pct, factor) = factor_for(feature, layer, rule)?;
    sink.emit(Event::PctFactor {
        layer: layer.to_string(),
        feature_id: feature.id.clone(),
        pct,
        factor,
    });

    let footprint = rasterizer.footprint_on(&feature.geometry, &grid)?;
    for idx in select_valid(&footprint, nodata_mask) {
        let value = &mut grid.values[idx];
        if options.zero_handling == ZeroHandling::Raise && *value == 0.0 {
            *value = options.zero_value;
        }
        *value *= factor;
    }
    Ok(grid)
}

/// Bring valid cells back into [0, 1] when any of them left it.
fn remediate(
    grid: &mut Grid,
    layer: &LayerName,
    handling: ExceedHandling,
    nodata_mask: Option<&[bool]>,
    sink: &mut dyn EventSink,
) {
    let is_valid = |idx: usize| nodata_mask.is_none_or(|mask| !mask[idx]);
    let Some((min, max)) = grid
        .values
        .iter()
        .enumerate()
        .filter(|&(idx, value)| is_valid(idx) && !value.is_nan())
        .map(|(_, &value)| value)
        .fold(None, |range: Option<(f64, f64)>, value| {
            Some(match range {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            })
        })
    else {
        return;
    };
    if min >= 0.0 && max <= 1.0 {
        return;
    }

    sink.emit(Event::OutOfRange {
        layer: layer.to_string(),
        min,
        max,
        handling: handling.to_string(),
    });

    let span = max - min;
    for (idx, value) in grid.values.iter_mut().enumerate() {
        if !is_valid(idx) {
            continue;
        }
        match handling {
            ExceedHandling::Clip => *value = value.clamp(0.0, 1.0),
            ExceedHandling::Normalize if span != 0.0 => *value = (*value - min) / span,
            ExceedHandling::Normalize => *value = 0.0,
            ExceedHandling::Ignore => {}
        }
    }
}
