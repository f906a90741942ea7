use crate::support::{print_json_or_exit, yes_no};
use canopy_kernel::{ConsistencyReport, Grid, RasterStore, TracingSink, check_consistency};
use canopy_store::FsRasterStore;
use serde_json::json;
use std::path::Path;

pub fn run(upper: String, lower: String, json_output: bool) {
    let store = FsRasterStore::default();
    let upper_grid = read_if_present(&store, &upper);
    let lower_grid = read_if_present(&store, &lower);

    let report = check_consistency(upper_grid.as_ref(), lower_grid.as_ref(), &mut TracingSink);

    if json_output {
        print_json_or_exit(&json!({
            "upper": upper,
            "lower": lower,
            "passed": report.passed(),
            "report": report,
        }));
        return;
    }

    println!("canopy consistency {upper} >= {lower}");
    match report {
        ConsistencyReport::Missing => println!("  Skipped: one or both rasters are missing"),
        ConsistencyReport::ShapeMismatch { upper, lower } => {
            println!("  Skipped: shapes differ ({upper:?} vs {lower:?})")
        }
        ConsistencyReport::Checked {
            violations,
            total,
            percent,
        } => {
            println!("  Violations: {violations} of {total} cells ({percent:.4}%)");
            println!("  Passed: {}", yes_no(violations == 0));
        }
    }
}

/// A raster that cannot be read counts as missing; the report says so.
fn read_if_present(store: &FsRasterStore, path: &str) -> Option<Grid> {
    let path = Path::new(path);
    if !store.exists(path) {
        return None;
    }
    store
        .read(path)
        .inspect_err(|e| tracing::warn!("cannot read {}: {e}", path.display()))
        .ok()
}
