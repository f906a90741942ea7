use crate::support::{
    fail, load_config_or_exit, load_vector_or_exit, print_json_or_exit, print_warnings, yes_no,
};
use canopy_kernel::{CenterRasterizer, ConsistencyReport, EventLog, Pipeline, Tee, TracingSink};
use canopy_store::{FsRasterStore, build_manifest, write_manifest};
use chrono::Utc;
use serde_json::json;

pub fn run(config: String, json_output: bool) {
    let run_config = load_config_or_exit(&config);
    let rules = run_config.rule_set().unwrap_or_else(|e| fail(e));
    let options = run_config.run_options().unwrap_or_else(|e| fail(e));
    let features = load_vector_or_exit(&run_config.vector_path());
    tracing::info!(
        config = %config,
        layers = rules.len(),
        features = features.len(),
        "starting run"
    );

    let mut store = FsRasterStore::default();
    let mut log = EventLog::new();
    let mut tracing_sink = TracingSink;
    let mut sink = Tee(&mut log, &mut tracing_sink);
    let summary = Pipeline::new(
        run_config.layout(),
        run_config.roles(),
        &CenterRasterizer,
        &mut store,
        &mut sink,
    )
    .run(&features, &rules, &options)
    .unwrap_or_else(|e| fail(e));

    let manifest_path = if summary.outputs.is_empty() {
        None
    } else {
        let manifest = build_manifest(&summary, Utc::now()).unwrap_or_else(|e| fail(e));
        Some(write_manifest(&run_config.output_dir(), &manifest).unwrap_or_else(|e| fail(e)))
    };

    if json_output {
        print_json_or_exit(&json!({
            "config": config,
            "summary": summary,
            "manifest": manifest_path,
            "events": log.events(),
        }));
        return;
    }

    println!("canopy apply {config}");
    println!("  Class: {}", summary.class.code());
    println!("  Features: {}", features.len());
    println!("  Outputs: {}", summary.outputs.len());
    for output in &summary.outputs {
        println!("    - {}: {}", output.layer, output.path.display());
    }
    if !summary.skipped.is_empty() {
        println!("  Skipped: {}", summary.skipped.join(", "));
    }
    if let Some(crs) = &summary.crs {
        println!("  CRS agreement: {}", yes_no(crs.all_match()));
    }
    if let Some(report) = &summary.consistency {
        match report {
            ConsistencyReport::Checked {
                violations,
                total,
                percent,
            } => println!("  Consistency: {violations} of {total} cells violate ({percent:.4}%)"),
            ConsistencyReport::Missing => println!("  Consistency: skipped (rasters missing)"),
            ConsistencyReport::ShapeMismatch { .. } => {
                println!("  Consistency: skipped (shapes differ)")
            }
        }
    }
    if let Some(path) = &manifest_path {
        println!("  Manifest: {}", path.display());
    }
    print_warnings(log.warnings());
}
