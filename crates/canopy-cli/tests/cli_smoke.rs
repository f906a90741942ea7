use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "canopy-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_canopy<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_canopy");
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("canopy command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, serde_json::to_string_pretty(value).expect("json"))
        .expect("fixture should be written");
}

fn grid(values: &[f64]) -> Value {
    json!({
        "width": values.len(),
        "height": 1,
        "transform": [1.0, 0.0, 0.0, 0.0, -1.0, 1.0],
        "nodata": -9999.0,
        "crs": "EPSG:3035",
        "values": values,
    })
}

fn left_cell_mask(properties: Value) -> Value {
    json!({
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:3035"}},
        "features": [{
            "type": "Feature",
            "id": "p1",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]},
            "properties": properties,
        }]
    })
}

fn write_workspace(root: &Path, rules: &str, properties: Value) -> PathBuf {
    write_json(&root.join("ucp/IMD.json"), &grid(&[0.4, 0.5]));
    write_json(&root.join("ucp/BSF.json"), &grid(&[0.2, 0.1]));
    write_json(&root.join("fractions/F_AC.json"), &grid(&[0.5, 0.5]));
    write_json(&root.join("fractions/F_GR.json"), &grid(&[0.5, 0.5]));
    write_json(&root.join("mask.geojson"), &left_cell_mask(properties));
    let config = root.join("canopy.toml");
    fs::write(
        &config,
        format!(
            "[paths]\nvector = \"mask.geojson\"\nucp = \"ucp\"\nfractions = \"fractions\"\noutput = \"out\"\n\n[rules]\n{rules}\n"
        ),
    )
    .expect("config should be written");
    config
}

fn read_values(path: &Path) -> Vec<f64> {
    let doc: Value =
        serde_json::from_str(&fs::read_to_string(path).expect("output should exist")).expect("json");
    serde_json::from_value(doc["values"].clone()).expect("values")
}

#[test]
fn classify_reports_mode_for_rule_file() {
    let tmp = TempDirGuard::new("classify");
    let rules = tmp.path().join("rules.json");
    write_json(&rules, &json!({"F_AC.tif": "pct", "IMD.tif": "none"}));

    let output = run_canopy(["classify", "--rules", rules.to_str().unwrap(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["code"], "PCT_WITH_NONE");
    assert_eq!(payload["layers"][0]["layer"], "F_AC");

    let text = run_canopy(["classify", "--rules", rules.to_str().unwrap()]);
    assert_success(&text);
    assert!(stdout_text(&text).contains("Class: PCT_WITH_NONE"));
}

#[test]
fn classify_rejects_mixed_mask_and_pct() {
    let tmp = TempDirGuard::new("classify-mixed");
    let rules = tmp.path().join("rules.json");
    write_json(&rules, &json!({"IMD": "mask", "BSF": "pct"}));

    let output = run_canopy(["classify", "--rules", rules.to_str().unwrap()]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid rule combination"));
}

#[test]
fn validate_flags_ordering_violation() {
    let tmp = TempDirGuard::new("validate");
    let rules = tmp.path().join("rules.json");
    write_json(&rules, &json!({"IMD": "mask", "BSF": "mask"}));
    let vector = tmp.path().join("mask.geojson");
    write_json(&vector, &left_cell_mask(json!({"IMD": 0.2, "BSF": 0.6})));

    let output = run_canopy([
        "validate",
        "--rules",
        rules.to_str().unwrap(),
        "--vector",
        vector.to_str().unwrap(),
        "--json",
    ]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["valid"], false);
    assert!(
        payload["error"]
            .as_str()
            .unwrap()
            .contains("IMD=0.2 < BSF=0.6")
    );
}

#[test]
fn apply_pct_writes_outputs_and_manifest() {
    let tmp = TempDirGuard::new("apply-pct");
    let config = write_workspace(
        tmp.path(),
        "\"F_AC.tif\" = \"pct\"\n\"F_GR.tif\" = \"pct\"\n\"IMD.tif\" = \"pct\"\n\"BSF.tif\" = \"pct\"",
        json!({"F_AC": 50, "F_GR": 0, "IMD": 50, "BSF": 0}),
    );

    let output = run_canopy(["apply", "--config", config.to_str().unwrap(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["summary"]["class"], "pct");
    assert_eq!(payload["summary"]["outputs"].as_array().unwrap().len(), 4);
    assert_eq!(payload["summary"]["consistency"]["status"], "checked");
    assert_eq!(payload["summary"]["consistency"]["violations"], 0);

    let out = tmp.path().join("out");
    let ac = read_values(&out.join("F_AC_pct.json"));
    let gr = read_values(&out.join("F_GR_pct.json"));
    assert!((ac[0] - 0.6).abs() < 1e-9);
    assert!((gr[0] - 0.4).abs() < 1e-9);
    assert!((ac[1] - 0.5).abs() < 1e-9);
    let imd = read_values(&out.join("IMD_pct.json"));
    assert!((imd[0] - 0.6).abs() < 1e-9);

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).expect("manifest"))
            .expect("manifest json");
    assert_eq!(manifest["class"], "PCT");
    assert_eq!(manifest["outputs"].as_array().unwrap().len(), 4);
    assert_eq!(manifest["outputs"][0]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn apply_mask_failure_leaves_no_outputs() {
    let tmp = TempDirGuard::new("apply-mask");
    let config = write_workspace(
        tmp.path(),
        "\"IMD.tif\" = \"mask\"\n\"BSF.tif\" = \"mask\"",
        json!({"IMD": 1.4, "BSF": 0.1}),
    );

    let output = run_canopy(["apply", "--config", config.to_str().unwrap()]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("values outside [0,1]"));
    assert!(!tmp.path().join("out/IMD_mask.json").exists());
    assert!(!tmp.path().join("out/manifest.json").exists());
}

#[test]
fn apply_rejects_unknown_exceed_handling_before_processing() {
    let tmp = TempDirGuard::new("apply-policy");
    let config = write_workspace(tmp.path(), "\"IMD.tif\" = \"pct\"", json!({"IMD": 10}));
    let mut text = fs::read_to_string(&config).expect("config");
    text.push_str("\n[pct]\nexceed_handling = \"wrap\"\n");
    fs::write(&config, text).expect("config should be rewritten");

    let output = run_canopy(["apply", "--config", config.to_str().unwrap()]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid exceed handling 'wrap'"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn crs_check_reports_mismatch_without_failing() {
    let tmp = TempDirGuard::new("crs");
    let config = write_workspace(tmp.path(), "\"IMD.tif\" = \"pct\"", json!({"IMD": 10}));
    let mut imd = grid(&[0.4, 0.5]);
    imd["crs"] = json!("EPSG:4326");
    write_json(&tmp.path().join("ucp/IMD.json"), &imd);

    let output = run_canopy(["crs-check", "--config", config.to_str().unwrap(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["allMatch"], false);
    assert_eq!(payload["report"]["mismatched"][0]["layer"], "IMD");
}

#[test]
fn consistency_counts_violating_cells() {
    let tmp = TempDirGuard::new("consistency");
    let upper = tmp.path().join("IMD_pct.json");
    let lower = tmp.path().join("BSF_pct.json");
    write_json(&upper, &grid(&[0.5, 0.1, -9999.0, 0.3]));
    write_json(&lower, &grid(&[0.2, 0.4, 0.9, 0.3]));

    let output = run_canopy([
        "consistency",
        "--upper",
        upper.to_str().unwrap(),
        "--lower",
        lower.to_str().unwrap(),
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["passed"], false);
    assert_eq!(payload["report"]["violations"], 1);
    assert_eq!(payload["report"]["total"], 4);
    assert_eq!(payload["report"]["percent"], 25.0);

    let missing = run_canopy([
        "consistency",
        "--upper",
        upper.to_str().unwrap(),
        "--lower",
        tmp.path().join("nope.json").to_str().unwrap(),
    ]);
    assert_success(&missing);
    assert!(stdout_text(&missing).contains("Skipped"));
}
