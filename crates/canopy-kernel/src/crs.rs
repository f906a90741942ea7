//! Coordinate reference system agreement between the vector mask and rasters.
//!
//! Advisory only: mismatches and unreadable rasters are reported, the run
//! carries on with the grids as they are.

use crate::events::{Event, EventSink};
use crate::layer::LayerRoles;
use crate::pipeline::Layout;
use crate::rule::RuleSet;
use crate::store::RasterStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrsMismatch {
    pub layer: String,
    pub raster_crs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrsReport {
    pub vector_crs: Option<String>,
    pub checked: usize,
    pub mismatched: Vec<CrsMismatch>,
    pub unreadable: Vec<String>,
}

impl CrsReport {
    pub fn all_match(&self) -> bool {
        self.mismatched.is_empty() && self.unreadable.is_empty()
    }
}

/// Identifiers compare case-insensitively with surrounding whitespace ignored.
pub fn same_crs(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (None, None) => true,
        _ => false,
    }
}

pub fn check_crs_match(
    vector_crs: Option<&str>,
    rules: &RuleSet,
    roles: &LayerRoles,
    layout: &Layout,
    store: &dyn RasterStore,
    sink: &mut dyn EventSink,
) -> CrsReport {
    let mut report = CrsReport {
        vector_crs: vector_crs.map(str::to_string),
        ..CrsReport::default()
    };

    for layer in rules.layers() {
        let path = layout.source(roles, layer);
        match store.read(&path) {
            Ok(grid) => {
                report.checked += 1;
                if !same_crs(grid.crs.as_deref(), vector_crs) {
                    sink.emit(Event::CrsMismatch {
                        layer: layer.to_string(),
                        raster_crs: grid.crs.clone(),
                        vector_crs: report.vector_crs.clone(),
                    });
                    report.mismatched.push(CrsMismatch {
                        layer: layer.to_string(),
                        raster_crs: grid.crs,
                    });
                }
            }
            Err(err) => {
                sink.emit(Event::CrsUnreadable {
                    layer: layer.to_string(),
                    message: err.to_string(),
                });
                report.unreadable.push(layer.to_string());
            }
        }
    }

    if report.mismatched.is_empty() {
        sink.emit(Event::CrsAgreement {
            layers: report.checked,
        });
    }
    report
}
