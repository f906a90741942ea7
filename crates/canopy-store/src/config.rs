//! Run configuration (TOML).
//!
//! ```toml
//! [paths]
//! vector = "mask.geojson"
//! ucp = "ucp"
//! fractions = "fractions"
//! output = "out"
//!
//! [rules]
//! "F_AC.tif" = "pct"
//! "IMD.tif" = "pct"
//!
//! [pct]
//! exceed_handling = "clip"
//! zero_handling = "raise"
//! zero_value = 0.01
//!
//! [layers]
//! fraction_prefix = "F_"
//! upper = "IMD"
//! lower = "BSF"
//! extension = "json"
//!
//! [checks]
//! crs = true
//! consistency = true
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use crate::atomic::read_text;
use crate::error::StoreError;
use crate::rules::rules_from_entries;
use canopy_kernel::layer::{DEFAULT_FRACTION_PREFIX, DEFAULT_LOWER_LAYER, DEFAULT_UPPER_LAYER};
use canopy_kernel::pct::DEFAULT_ZERO_VALUE;
use canopy_kernel::{LayerName, LayerRoles, Layout, PctOptions, RuleSet, RunOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub rules: toml::Table,
    #[serde(default)]
    pub pct: PctConfig,
    #[serde(default)]
    pub layers: LayersConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    /// Directory relative paths resolve against. Not part of the file.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub vector: PathBuf,
    pub ucp: PathBuf,
    pub fractions: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PctConfig {
    pub exceed_handling: String,
    pub zero_handling: String,
    pub zero_value: f64,
}

impl Default for PctConfig {
    fn default() -> Self {
        Self {
            exceed_handling: "clip".to_string(),
            zero_handling: "raise".to_string(),
            zero_value: DEFAULT_ZERO_VALUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayersConfig {
    pub fraction_prefix: String,
    pub upper: String,
    pub lower: String,
    pub extension: String,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            fraction_prefix: DEFAULT_FRACTION_PREFIX.to_string(),
            upper: DEFAULT_UPPER_LAYER.to_string(),
            lower: DEFAULT_LOWER_LAYER.to_string(),
            extension: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChecksConfig {
    pub crs: bool,
    pub consistency: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            crs: true,
            consistency: true,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = read_text(path)?;
        let mut config = Self::from_toml_str(path, &text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, StoreError> {
        toml::from_str(text).map_err(|e| StoreError::parse(path, e))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn vector_path(&self) -> PathBuf {
        self.resolve(&self.paths.vector)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.paths.output)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(
            self.resolve(&self.paths.ucp),
            self.resolve(&self.paths.fractions),
            self.output_dir(),
            self.layers.extension.as_str(),
        )
    }

    pub fn roles(&self) -> LayerRoles {
        LayerRoles {
            fraction_prefix: self.layers.fraction_prefix.clone(),
            upper: LayerName::normalize(&self.layers.upper),
            lower: LayerName::normalize(&self.layers.lower),
        }
    }

    /// The `[rules]` table as a rule set, in file order.
    pub fn rule_set(&self) -> Result<RuleSet, StoreError> {
        if self.rules.is_empty() {
            return Err(StoreError::Config("[rules] table is empty".to_string()));
        }
        rules_from_entries(
            Path::new("[rules]"),
            self.rules.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    /// Policy tokens are checked here, before any raster is touched.
    pub fn run_options(&self) -> Result<RunOptions, StoreError> {
        Ok(RunOptions {
            pct: PctOptions::parse(
                &self.pct.exceed_handling,
                &self.pct.zero_handling,
                self.pct.zero_value,
            )?,
            check_crs: self.checks.crs,
            check_consistency: self.checks.consistency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_kernel::{CanopyError, ExceedHandling, Rule};

    const FULL: &str = r#"
[paths]
vector = "mask.geojson"
ucp = "ucp"
fractions = "/data/fractions"
output = "out"

[rules]
"IMD.tif" = "pct"
"F_AC.tif" = "pct"
"BSF.tif" = "none"

[pct]
exceed_handling = "normalize"

[layers]
extension = "asc"

[checks]
crs = false
"#;

    fn config(text: &str) -> RunConfig {
        let mut config = RunConfig::from_toml_str(Path::new("canopy.toml"), text).unwrap();
        config.base_dir = PathBuf::from("/work");
        config
    }

    #[test]
    fn resolves_paths_defaults_and_rule_order() {
        let config = config(FULL);
        assert_eq!(config.vector_path(), PathBuf::from("/work/mask.geojson"));
        let layout = config.layout();
        assert_eq!(layout.ucp_dir, PathBuf::from("/work/ucp"));
        assert_eq!(layout.fractions_dir, PathBuf::from("/data/fractions"));
        assert_eq!(layout.extension, "asc");

        let rules = config.rule_set().unwrap();
        let layers: Vec<_> = rules.layers().map(LayerName::as_str).collect();
        assert_eq!(layers, ["IMD", "F_AC", "BSF"]);
        assert_eq!(rules.get(&"BSF".into()), Some(Rule::None));

        let options = config.run_options().unwrap();
        assert_eq!(options.pct.exceed_handling, ExceedHandling::Normalize);
        assert_eq!(options.pct.zero_value, DEFAULT_ZERO_VALUE);
        assert!(!options.check_crs);
        assert!(options.check_consistency);
        assert_eq!(config.roles(), LayerRoles::default());
    }

    #[test]
    fn bad_policy_tokens_fail_eagerly() {
        let config = config(&FULL.replace("\"normalize\"", "\"squash\""));
        assert!(matches!(
            config.run_options(),
            Err(StoreError::Kernel(CanopyError::InvalidExceedHandling(_)))
        ));
    }

    #[test]
    fn unknown_keys_and_empty_rules_are_rejected() {
        assert!(matches!(
            RunConfig::from_toml_str(Path::new("c.toml"), &format!("{FULL}\n[extra]\nx = 1\n")),
            Err(StoreError::Parse { .. })
        ));
        let no_rules = config(
            "[paths]\nvector = \"m.geojson\"\nucp = \"u\"\nfractions = \"f\"\noutput = \"o\"\n",
        );
        assert!(matches!(no_rules.rule_set(), Err(StoreError::Config(_))));
    }
}
