use crate::support::{fail, load_rules_or_exit, print_json_or_exit};
use canopy_kernel::{EventLog, classify};
use serde_json::json;

pub fn run(rules: String, json_output: bool) {
    let rule_set = load_rules_or_exit(&rules);
    let mut log = EventLog::new();
    let classification = classify(&rule_set, &mut log).unwrap_or_else(|e| fail(e));

    if json_output {
        let layers: Vec<_> = rule_set
            .iter()
            .map(|(layer, rule)| json!({ "layer": layer, "rule": rule }))
            .collect();
        print_json_or_exit(&json!({
            "rules": rules,
            "class": classification.class,
            "code": classification.class.code(),
            "layers": layers,
        }));
    } else {
        println!("canopy classify {rules}");
        println!("  Layers: {}", rule_set.len());
        println!("  Class: {}", classification.class.code());
    }
}
