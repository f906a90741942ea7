use crate::support::{
    fail, load_rules_or_exit, load_vector_or_exit, print_json_or_exit, print_warnings,
};
use canopy_kernel::{EventLog, LayerName, LayerRoles, Tee, TracingSink, validate_mask_features};
use serde_json::json;
use std::path::Path;

pub struct Args {
    pub rules: String,
    pub vector: String,
    pub upper: String,
    pub lower: String,
    pub fraction_prefix: String,
    pub json: bool,
}

pub fn run(args: Args) {
    let rules = load_rules_or_exit(&args.rules);
    let features = load_vector_or_exit(Path::new(&args.vector));
    let roles = LayerRoles {
        fraction_prefix: args.fraction_prefix,
        upper: LayerName::normalize(&args.upper),
        lower: LayerName::normalize(&args.lower),
    };

    let mut log = EventLog::new();
    let mut tracing_sink = TracingSink;
    let result = validate_mask_features(
        &features,
        &rules,
        &roles,
        &mut Tee(&mut log, &mut tracing_sink),
    );

    if args.json {
        let (valid, error) = match &result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        print_json_or_exit(&json!({
            "vector": args.vector,
            "features": features.len(),
            "valid": valid,
            "error": error,
            "events": log.events(),
        }));
        if !valid {
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = result {
        fail(e);
    }
    println!("canopy validate {}", args.vector);
    println!("  Features: {}", features.len());
    println!("  Valid: yes");
    print_warnings(log.warnings());
}
