use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use provena_calibration::{CalibrationMetadata, Calibrator, FallbackReason};
use provena_core::{clamp_confidence, ConfidenceBucket, EntityValue, Evidence, SCHEMA_VERSION};

use crate::candidate::Candidate;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("invalid map: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}

/// The entities this crate knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Merchant,
    Date,
    Currency,
    Total,
    Tax,
    InvoiceId,
    PaymentMethod,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Merchant,
        Entity::Date,
        Entity::Currency,
        Entity::Total,
        Entity::Tax,
        Entity::InvoiceId,
        Entity::PaymentMethod,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Merchant => "merchant",
            Entity::Date => "date",
            Entity::Currency => "currency",
            Entity::Total => "total",
            Entity::Tax => "tax",
            Entity::InvoiceId => "invoice_id",
            Entity::PaymentMethod => "payment_method",
        }
    }

    /// Found by keyword alone, with no numeric or layout structure to lean on.
    pub fn is_keyword_only(self) -> bool {
        matches!(self, Entity::InvoiceId | Entity::PaymentMethod)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resolved value of one entity. Invariant: `value` is `None` exactly
/// when `confidence == 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    pub entity: Entity,
    pub value: Option<EntityValue>,
    pub confidence: f32,
    pub bucket: ConfidenceBucket,
    /// Ranked, best first.
    pub candidates: Vec<Candidate>,
    pub evidence: Evidence,
    pub schema_version: u32,
}

impl EntityResult {
    pub fn winner(&self) -> Option<&Candidate> {
        self.value.as_ref().and_then(|_| self.candidates.first())
    }

    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }

    /// Run this result through the calibration gate and record what happened
    /// under the `calibration` evidence key.
    pub fn calibrate(mut self, calibrator: &Calibrator) -> Self {
        let name = self.entity.as_str();
        let meta = if self.value.is_none() {
            CalibrationMetadata::skipped(name, self.confidence, FallbackReason::NoValue)
        } else {
            let (calibrated, meta) = calibrator.apply(name, self.confidence, &self.evidence);
            if meta.applied {
                // Keep a found value distinguishable from "not found".
                self.confidence = clamp_confidence(calibrated).max(crate::resolve::MIN_FOUND_CONFIDENCE);
                self.bucket = ConfidenceBucket::from_confidence(self.confidence);
                debug!(entity = name, raw = meta.raw, calibrated = self.confidence, "calibrated");
            }
            meta
        };
        self.evidence.insert("calibration", &meta);
        self
    }

    pub fn calibration(&self) -> Option<CalibrationMetadata> {
        self.evidence
            .get("calibration")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn to_map(&self) -> Result<serde_json::Value, MapError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_map(value: serde_json::Value) -> Result<Self, MapError> {
        let result: Self = serde_json::from_value(value)?;
        if result.schema_version > SCHEMA_VERSION {
            return Err(MapError::SchemaVersion {
                found: result.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::resolve::resolve;
    use provena_calibration::CalibrationSettings;

    fn found_result() -> EntityResult {
        let doc = Document::from_lines(&["Invoice No: A-1001"]);
        let mut c = Candidate::new(&doc, "A-1001", "test", 0, "Invoice No: A-1001");
        c.adjust("base", 1.0);
        c.label("invoice", 1.0);
        resolve(Entity::InvoiceId, vec![c], Evidence::new())
    }

    #[test]
    fn map_round_trip_preserves_everything() {
        let r = found_result();
        let map = r.to_map().unwrap();
        assert_eq!(map["entity"], "invoice_id");
        assert_eq!(map["value"]["kind"], "text");
        let back = EntityResult::from_map(map).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut map = found_result().to_map().unwrap();
        map["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        assert!(matches!(
            EntityResult::from_map(map),
            Err(MapError::SchemaVersion { .. })
        ));
    }

    #[test]
    fn disabled_calibration_leaves_confidence_alone() {
        let r = found_result();
        let before = r.confidence;
        let r = r.calibrate(&Calibrator::new(CalibrationSettings::default()));
        assert_eq!(r.confidence, before);
        let meta = r.calibration().unwrap();
        assert!(!meta.applied);
        assert_eq!(meta.reason, Some(FallbackReason::CalibrationDisabled));
    }

    #[test]
    fn missing_value_is_never_calibrated() {
        let r = resolve(Entity::Total, Vec::new(), Evidence::new());
        let r = r.calibrate(&Calibrator::disabled());
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.calibration().unwrap().reason, Some(FallbackReason::NoValue));
    }
}
