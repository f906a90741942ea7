//! Standalone rule files: `{"F_AC.tif": "pct", "IMD.tif": "none"}`.
//!
//! Key order in the file is the rule order of the run.

use crate::atomic::read_text;
use crate::error::StoreError;
use canopy_kernel::RuleSet;
use serde_json::{Map, Value};
use std::path::Path;

pub fn load_rules_json(path: &Path) -> Result<RuleSet, StoreError> {
    let text = read_text(path)?;
    parse_rules_json(path, &text)
}

pub fn parse_rules_json(path: &Path, text: &str) -> Result<RuleSet, StoreError> {
    let map: Map<String, Value> =
        serde_json::from_str(text).map_err(|e| StoreError::parse(path, e))?;
    rules_from_entries(path, map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Collect `(layer, token)` pairs, failing on any non-string token.
pub(crate) fn rules_from_entries<'a>(
    path: &Path,
    entries: impl Iterator<Item = (&'a str, Option<&'a str>)>,
) -> Result<RuleSet, StoreError> {
    let pairs = entries
        .map(|(layer, token)| {
            token.map(|token| (layer, token)).ok_or_else(|| {
                StoreError::parse(path, format!("rule for '{layer}' must be a string"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleSet::parse(pairs)?)
}
