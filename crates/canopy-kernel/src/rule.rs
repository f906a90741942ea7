//! Per-layer rules and the ordered rule set supplied for one run.

use crate::error::{CanopyError, Result};
use crate::layer::{LayerName, LayerRoles};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How a layer is adjusted by polygon attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Leave the layer untouched (0% under percentage modes).
    None,
    /// Burn the attribute value directly into the raster.
    Mask,
    /// Scale pixels by `1 + attribute / 100`.
    Pct,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::None => "none",
            Rule::Mask => "mask",
            Rule::Pct => "pct",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Rule::None),
            "mask" => Ok(Rule::Mask),
            "pct" => Ok(Rule::Pct),
            other => Err(CanopyError::InvalidRuleCombination {
                found: vec![other.to_string()],
                reason: "unrecognized rule token; use 'mask', 'pct', or 'none'".to_string(),
            }),
        }
    }
}

/// Layer → rule mapping in caller order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    entries: Vec<(LayerName, Rule)>,
}

impl RuleSet {
    /// Build from raw `(layer, token)` pairs. Layer keys are
    /// extension-normalized; two keys naming the same layer are rejected.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = Self::default();
        for (layer, token) in pairs {
            let rule: Rule = token.as_ref().parse()?;
            set.insert(LayerName::normalize(layer.as_ref()), rule)?;
        }
        Ok(set)
    }

    fn insert(&mut self, layer: LayerName, rule: Rule) -> Result<()> {
        if let Some(previous) = self.get(&layer) {
            return Err(CanopyError::InvalidRuleCombination {
                found: vec![previous.to_string(), rule.to_string()],
                reason: format!("layer '{layer}' is named more than once"),
            });
        }
        self.entries.push((layer, rule));
        Ok(())
    }

    pub fn get(&self, layer: &LayerName) -> Option<Rule> {
        self.entries
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, rule)| *rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LayerName, Rule)> {
        self.entries.iter().map(|(name, rule)| (name, *rule))
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerName> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct rule values present.
    pub fn distinct(&self) -> BTreeSet<Rule> {
        self.entries.iter().map(|(_, rule)| *rule).collect()
    }

    /// Split into (fraction, scalar) rule sets, preserving order.
    pub fn split(&self, roles: &LayerRoles) -> (RuleSet, RuleSet) {
        let (fractions, scalars): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .cloned()
            .partition(|(name, _)| roles.is_fraction(name));
        (
            RuleSet { entries: fractions },
            RuleSet { entries: scalars },
        )
    }

    /// Keep only entries whose rule satisfies `keep`.
    pub fn filtered(&self, keep: impl Fn(Rule) -> bool) -> RuleSet {
        RuleSet {
            entries: self
                .entries
                .iter()
                .filter(|(_, rule)| keep(*rule))
                .cloned()
                .collect(),
        }
    }
}
