use crate::support::{fail, load_config_or_exit, load_vector_or_exit, print_json_or_exit, yes_no};
use canopy_kernel::{CenterRasterizer, Pipeline, TracingSink};
use canopy_store::FsRasterStore;
use serde_json::json;

pub fn run(config: String, json_output: bool) {
    let run_config = load_config_or_exit(&config);
    let rules = run_config.rule_set().unwrap_or_else(|e| fail(e));
    let features = load_vector_or_exit(&run_config.vector_path());

    let mut store = FsRasterStore::default();
    let mut sink = TracingSink;
    let report = Pipeline::new(
        run_config.layout(),
        run_config.roles(),
        &CenterRasterizer,
        &mut store,
        &mut sink,
    )
    .check_crs(&features, &rules);

    if json_output {
        print_json_or_exit(&json!({
            "config": config,
            "allMatch": report.all_match(),
            "report": report,
        }));
        return;
    }

    println!("canopy crs-check {config}");
    println!(
        "  Vector CRS: {}",
        report.vector_crs.as_deref().unwrap_or("unknown")
    );
    println!("  Rasters checked: {}", report.checked);
    println!("  All match: {}", yes_no(report.all_match()));
    for mismatch in &report.mismatched {
        println!(
            "    - {}: {}",
            mismatch.layer,
            mismatch.raster_crs.as_deref().unwrap_or("unknown")
        );
    }
    for layer in &report.unreadable {
        println!("    - {layer}: unreadable");
    }
}
