//! Post-hoc `upper >= lower` check over two finished rasters. Report only.

use crate::events::{Event, EventSink};
use crate::grid::{Grid, is_nodata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsistencyReport {
    /// One or both rasters were not available.
    Missing,
    /// The rasters cannot be compared cell by cell.
    ShapeMismatch {
        upper: (usize, usize),
        lower: (usize, usize),
    },
    Checked {
        violations: usize,
        total: usize,
        /// Violations as a percentage of all cells.
        percent: f64,
    },
}

impl ConsistencyReport {
    pub fn passed(&self) -> bool {
        matches!(self, ConsistencyReport::Checked { violations: 0, .. })
    }
}

/// Count cells where `upper < lower`, skipping NaN and NoData cells.
pub fn check_consistency(
    upper: Option<&Grid>,
    lower: Option<&Grid>,
    sink: &mut dyn EventSink,
) -> ConsistencyReport {
    let (Some(upper), Some(lower)) = (upper, lower) else {
        sink.emit(Event::ConsistencySkipped {
            reason: "one or both rasters are missing".to_string(),
        });
        return ConsistencyReport::Missing;
    };
    if upper.shape() != lower.shape() {
        sink.emit(Event::ConsistencySkipped {
            reason: format!(
                "shapes differ: {:?} vs {:?}",
                upper.shape(),
                lower.shape()
            ),
        });
        return ConsistencyReport::ShapeMismatch {
            upper: upper.shape(),
            lower: lower.shape(),
        };
    }

    let violations = upper
        .values
        .iter()
        .zip(&lower.values)
        .filter(|&(&u, &l)| {
            !u.is_nan()
                && !l.is_nan()
                && !is_nodata(u, upper.nodata)
                && !is_nodata(l, lower.nodata)
                && u < l
        })
        .count();
    let total = upper.len();
    let percent = if total == 0 {
        0.0
    } else {
        violations as f64 * 100.0 / total as f64
    };
    sink.emit(Event::ConsistencyChecked {
        violations,
        total,
        percent,
    });
    ConsistencyReport::Checked {
        violations,
        total,
        percent,
    }
}
