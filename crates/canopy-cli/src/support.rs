use canopy_kernel::{Event, FeatureCollection, RuleSet};
use canopy_store::{RunConfig, load_rules_json, load_vector_mask};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "canopy=info";

/// Diagnostics go to stderr so `--json` stdout stays machine-readable.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn load_rules_or_exit(path: &str) -> RuleSet {
    load_rules_json(Path::new(path))
        .unwrap_or_else(|e| fail(format_args!("failed to load rules {path}: {e}")))
}

pub fn load_vector_or_exit(path: &Path) -> FeatureCollection {
    load_vector_mask(path)
        .unwrap_or_else(|e| fail(format_args!("failed to load vector mask {}: {e}", path.display())))
}

pub fn load_config_or_exit(path: &str) -> RunConfig {
    RunConfig::load(Path::new(path))
        .unwrap_or_else(|e| fail(format_args!("failed to load config {path}: {e}")))
}

pub fn print_json_or_exit(payload: &impl Serialize) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: failed to render JSON output: {e}");
            std::process::exit(2);
        }
    }
}

pub fn print_warnings<'a>(warnings: impl IntoIterator<Item = &'a Event>) {
    let warnings: Vec<_> = warnings.into_iter().collect();
    if warnings.is_empty() {
        return;
    }
    println!("  Warnings ({}):", warnings.len());
    for event in warnings {
        println!("    - {}", event.message());
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
