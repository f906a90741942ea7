//! Run manifest: what a run wrote, with content digests.

use crate::atomic::write_atomic;
use crate::error::StoreError;
use canopy_kernel::RunSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_SCHEMA: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub layer: String,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema: u32,
    pub generated_at: DateTime<Utc>,
    pub class: String,
    pub outputs: Vec<ManifestEntry>,
    pub skipped: Vec<String>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

/// Hash every output the summary lists. Paths are read as written.
pub fn build_manifest(summary: &RunSummary, now: DateTime<Utc>) -> Result<Manifest, StoreError> {
    let outputs = summary
        .outputs
        .iter()
        .map(|output| {
            let bytes = fs::read(&output.path).map_err(|e| StoreError::io(&output.path, e))?;
            Ok(ManifestEntry {
                layer: output.layer.clone(),
                path: output.path.clone(),
                sha256: sha256_hex(&bytes),
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(Manifest {
        schema: MANIFEST_SCHEMA,
        generated_at: now,
        class: summary.class.code().to_string(),
        outputs,
        skipped: summary.skipped.clone(),
    })
}

pub fn write_manifest(output_dir: &Path, manifest: &Manifest) -> Result<PathBuf, StoreError> {
    let path = output_dir.join(MANIFEST_FILE);
    let mut text = serde_json::to_string_pretty(manifest).map_err(|e| StoreError::Encode {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    text.push('\n');
    write_atomic(&path, text.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use canopy_kernel::{RuleClass, WrittenOutput};
    use chrono::TimeZone;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn manifest_lists_outputs_with_digests() {
        let dir = temp_dir("manifest");
        let output = dir.join("IMD_pct.json");
        fs::write(&output, b"").expect("fixture should write");
        let summary = RunSummary {
            class: RuleClass::Pct,
            outputs: vec![WrittenOutput {
                layer: "IMD".to_string(),
                path: output.clone(),
            }],
            skipped: vec!["WAW".to_string()],
            crs: None,
            consistency: None,
        };
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");

        let manifest = build_manifest(&summary, now).expect("manifest should build");
        assert_eq!(manifest.class, "PCT");
        assert_eq!(manifest.outputs[0].sha256.len(), 64);

        let path = write_manifest(&dir, &manifest).expect("manifest should write");
        let back: Manifest =
            serde_json::from_str(&fs::read_to_string(path).expect("manifest should read"))
                .expect("manifest should parse");
        assert_eq!(back, manifest);
        let _ = fs::remove_dir_all(dir);
    }
}
