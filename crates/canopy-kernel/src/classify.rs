//! Rule-set classification.
//!
//! The distinct set of rule tokens decides the processing mode:
//!
//! ```text
//! {none}        → NONE            (no processing)
//! {mask}        → MASK            (validate, then burn values)
//! {pct}         → PCT
//! {pct, none}   → PCT_WITH_NONE   (none layers count as 0%)
//! {mask, none}  → error           (mask must cover every layer)
//! mask + pct    → error           (modes are exclusive)
//! ```

use crate::error::{CanopyError, Result};
use crate::events::{Event, EventSink};
use crate::rule::{Rule, RuleSet};
use serde::{Deserialize, Serialize};

/// A legal processing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    None,
    Mask,
    Pct,
    PctWithNone,
}

impl RuleClass {
    pub fn code(self) -> &'static str {
        match self {
            RuleClass::None => "NONE",
            RuleClass::Mask => "MASK",
            RuleClass::Pct => "PCT",
            RuleClass::PctWithNone => "PCT_WITH_NONE",
        }
    }
}

/// Reserved classification metadata. Intentionally empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationInfo {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub class: RuleClass,
    pub info: ClassificationInfo,
}

pub fn classify(rules: &RuleSet, sink: &mut dyn EventSink) -> Result<Classification> {
    let distinct = rules.distinct();
    let found = || distinct.iter().map(|rule| rule.to_string()).collect::<Vec<_>>();
    let has = |rule: Rule| distinct.contains(&rule);

    let class = match (has(Rule::Mask), has(Rule::Pct), has(Rule::None)) {
        (false, false, true) => RuleClass::None,
        (true, false, false) => RuleClass::Mask,
        (false, true, false) => RuleClass::Pct,
        (false, true, true) => RuleClass::PctWithNone,
        (true, false, true) => {
            return Err(CanopyError::InvalidRuleCombination {
                found: found(),
                reason: "mask cannot be mixed with none; give every layer a mask value"
                    .to_string(),
            });
        }
        (true, true, _) => {
            return Err(CanopyError::InvalidRuleCombination {
                found: found(),
                reason: "mask and pct are mutually exclusive".to_string(),
            });
        }
        (false, false, false) => {
            return Err(CanopyError::InvalidRuleCombination {
                found: found(),
                reason: "rule set is empty".to_string(),
            });
        }
    };

    sink.emit(Event::Classified { class });
    Ok(Classification {
        class,
        info: ClassificationInfo::default(),
    })
}
