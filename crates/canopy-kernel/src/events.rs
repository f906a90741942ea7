//! Structured diagnostics channel.
//!
//! The engine never prints. It pushes [`Event`]s into a caller-supplied
//! [`EventSink`]: capture them with [`EventLog`], forward them to
//! `tracing` with [`TracingSink`], or drop them with [`Silent`].

use crate::classify::RuleClass;
use serde::{Deserialize, Serialize};

/// Severity of an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Classified {
        class: RuleClass,
    },
    NoDataDetected {
        layer: String,
        count: usize,
    },
    NoDataUndefined {
        layer: String,
    },
    FeatureValidated {
        feature_id: String,
        upper: f64,
        lower: f64,
        fraction_sum: Option<f64>,
    },
    PctFactor {
        layer: String,
        feature_id: String,
        pct: f64,
        factor: f64,
    },
    FootprintEmpty {
        feature_id: String,
    },
    MaskValueMissing {
        layer: String,
        feature_id: String,
    },
    OutOfRange {
        layer: String,
        min: f64,
        max: f64,
        handling: String,
    },
    FractionSums {
        feature_id: String,
        pixels: usize,
        min: f64,
        max: f64,
        mean: f64,
    },
    RasterMissing {
        layer: String,
        path: String,
    },
    CrsUnreadable {
        layer: String,
        message: String,
    },
    CrsMismatch {
        layer: String,
        raster_crs: Option<String>,
        vector_crs: Option<String>,
    },
    CrsAgreement {
        layers: usize,
    },
    ConsistencySkipped {
        reason: String,
    },
    ConsistencyChecked {
        violations: usize,
        total: usize,
        percent: f64,
    },
    OutputWritten {
        layer: String,
        path: String,
    },
}

impl Event {
    pub fn severity(&self) -> Severity {
        match self {
            Event::MaskValueMissing { .. }
            | Event::OutOfRange { .. }
            | Event::RasterMissing { .. }
            | Event::CrsUnreadable { .. }
            | Event::CrsMismatch { .. }
            | Event::ConsistencySkipped { .. }
            | Event::NoDataUndefined { .. } => Severity::Warning,
            Event::ConsistencyChecked { violations, .. } if *violations > 0 => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// One-line human rendering.
    pub fn message(&self) -> String {
        match self {
            Event::Classified { class } => format!("rule set classified as {}", class.code()),
            Event::NoDataDetected { layer, count } => {
                format!("{layer}: detected {count} NoData pixels")
            }
            Event::NoDataUndefined { layer } => {
                format!("{layer}: no explicit NoData value defined")
            }
            Event::FeatureValidated {
                feature_id,
                upper,
                lower,
                fraction_sum,
            } => match fraction_sum {
                Some(sum) => format!(
                    "feature {feature_id}: upper={upper} lower={lower} fraction sum={sum}"
                ),
                None => format!("feature {feature_id}: upper={upper} lower={lower}"),
            },
            Event::PctFactor {
                layer,
                feature_id,
                pct,
                factor,
            } => format!("{layer}: feature {feature_id} pct={pct} factor={factor}"),
            Event::FootprintEmpty { feature_id } => {
                format!("feature {feature_id}: footprint selects no pixels")
            }
            Event::MaskValueMissing { layer, feature_id } => {
                format!("{layer}: feature {feature_id} has no value; left unmasked")
            }
            Event::OutOfRange {
                layer,
                min,
                max,
                handling,
            } => format!("{layer}: values outside [0,1] (min={min}, max={max}); handling={handling}"),
            Event::FractionSums {
                feature_id,
                pixels,
                min,
                max,
                mean,
            } => format!(
                "feature {feature_id}: {pixels} pixels, fraction sum min={min} max={max} mean={mean}"
            ),
            Event::RasterMissing { layer, path } => {
                format!("{layer}: missing raster file {path}; skipped")
            }
            Event::CrsUnreadable { layer, message } => {
                format!("{layer}: could not open raster: {message}")
            }
            Event::CrsMismatch {
                layer,
                raster_crs,
                vector_crs,
            } => format!(
                "{layer}: CRS {} differs from vector CRS {}",
                raster_crs.as_deref().unwrap_or("<none>"),
                vector_crs.as_deref().unwrap_or("<none>")
            ),
            Event::CrsAgreement { layers } => {
                format!("all {layers} raster layers share the vector CRS")
            }
            Event::ConsistencySkipped { reason } => format!("consistency check skipped: {reason}"),
            Event::ConsistencyChecked {
                violations,
                total,
                percent,
            } => {
                if *violations == 0 {
                    format!("consistency check passed over {total} pixels")
                } else {
                    format!(
                        "{violations} of {total} pixels ({percent:.2}%) have upper < lower; \
                         consider adjusting the pct attributes"
                    )
                }
            }
            Event::OutputWritten { layer, path } => format!("{layer}: wrote {path}"),
        }
    }
}

/// Receiver for engine diagnostics.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// Captures every event in order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(|event| event.severity() == Severity::Warning)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: Event) {
        match event.severity() {
            Severity::Warning => tracing::warn!("{}", event.message()),
            Severity::Info => tracing::info!("{}", event.message()),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl EventSink for Silent {
    fn emit(&mut self, _event: Event) {}
}

/// Fan out to two sinks.
pub struct Tee<'a, A: EventSink + ?Sized, B: EventSink + ?Sized>(pub &'a mut A, pub &'a mut B);

impl<A: EventSink + ?Sized, B: EventSink + ?Sized> EventSink for Tee<'_, A, B> {
    fn emit(&mut self, event: Event) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}
