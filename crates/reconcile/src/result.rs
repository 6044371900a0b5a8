use serde::{Deserialize, Serialize};
use std::fmt;

use provena_core::{clamp_confidence, Money};

/// Which strategy produced a reconciled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Regex,
    AlignedColumns,
    AlignedConfirmedBySemantic,
    SemanticSoftFallback,
    Existing,
    None,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Regex => "regex",
            Provenance::AlignedColumns => "aligned_columns",
            Provenance::AlignedConfirmedBySemantic => "aligned_confirmed_by_semantic",
            Provenance::SemanticSoftFallback => "semantic_soft_fallback",
            Provenance::Existing => "existing",
            Provenance::None => "none",
        };
        write!(f, "{s}")
    }
}

/// Why a value is null or a signal was kept away from scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatedReason {
    InsufficientComponents,
    LowSupportConf,
    NoMismatch,
    NoLabelFound,
    NotPresentInDocument,
    LabelWithoutAmount,
    NoTotalSource,
}

impl fmt::Display for GatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatedReason::InsufficientComponents => "insufficient_components",
            GatedReason::LowSupportConf => "low_support_conf",
            GatedReason::NoMismatch => "no_mismatch",
            GatedReason::NoLabelFound => "no_label_found",
            GatedReason::NotPresentInDocument => "not_present_in_document",
            GatedReason::LabelWithoutAmount => "label_without_amount",
            GatedReason::NoTotalSource => "no_total_source",
        };
        write!(f, "{s}")
    }
}

/// One reconciled amount field. `gated_reason` is set whenever `value` is null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledAmount {
    pub value: Option<Money>,
    pub provenance: Provenance,
    pub confidence: f32,
    pub gated_reason: Option<GatedReason>,
}

impl ReconciledAmount {
    pub fn found(value: Money, provenance: Provenance, confidence: f32) -> Self {
        Self {
            value: Some(value),
            provenance,
            confidence: clamp_confidence(confidence),
            gated_reason: None,
        }
    }

    pub fn missing(reason: GatedReason) -> Self {
        Self {
            value: None,
            provenance: Provenance::None,
            confidence: 0.0,
            gated_reason: Some(reason),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MismatchStrength {
    None,
    Weak,
    Medium,
    Strong,
    Unknown,
}

impl fmt::Display for MismatchStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MismatchStrength::None => "NONE",
            MismatchStrength::Weak => "WEAK",
            MismatchStrength::Medium => "MEDIUM",
            MismatchStrength::Strong => "STRONG",
            MismatchStrength::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Items-vs-total disagreement. Always reported; only `applied_to_score`
/// lets it influence anything downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchSignal {
    pub computable: bool,
    pub strength: MismatchStrength,
    pub ratio: Option<f64>,
    pub support: Option<f32>,
    pub applied_to_score: bool,
    pub gated_reason: Option<GatedReason>,
    /// items_sum + tax, when computable.
    pub expected_total: Option<Money>,
}

impl MismatchSignal {
    pub fn not_computable() -> Self {
        Self {
            computable: false,
            strength: MismatchStrength::Unknown,
            ratio: None,
            support: None,
            applied_to_score: false,
            gated_reason: Some(GatedReason::InsufficientComponents),
            expected_total: None,
        }
    }
}

/// The reconciled financial picture of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub total: ReconciledAmount,
    pub subtotal: ReconciledAmount,
    pub tax: ReconciledAmount,
    pub discount: ReconciledAmount,
    pub tip: ReconciledAmount,
    pub items_sum: Option<Money>,
    pub used_raw_items_sum: bool,
    /// Confidence of the total source.
    pub confidence: f32,
    pub mismatch: MismatchSignal,
    /// Ordered notes describing each decision taken.
    pub trace: Vec<String>,
    pub schema_version: u32,
}

impl ReconciliationResult {
    pub fn to_map(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_map(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_display_matches_serde() {
        for p in [
            Provenance::Regex,
            Provenance::AlignedColumns,
            Provenance::AlignedConfirmedBySemantic,
            Provenance::SemanticSoftFallback,
            Provenance::Existing,
            Provenance::None,
        ] {
            assert_eq!(serde_json::to_value(p).unwrap(), serde_json::json!(p.to_string()));
        }
    }

    #[test]
    fn gated_reason_display_matches_serde() {
        for r in [
            GatedReason::InsufficientComponents,
            GatedReason::LowSupportConf,
            GatedReason::NoMismatch,
            GatedReason::NoLabelFound,
            GatedReason::NotPresentInDocument,
            GatedReason::LabelWithoutAmount,
            GatedReason::NoTotalSource,
        ] {
            assert_eq!(serde_json::to_value(r).unwrap(), serde_json::json!(r.to_string()));
        }
    }

    #[test]
    fn missing_amount_is_schema_complete() {
        let m = ReconciledAmount::missing(GatedReason::NotPresentInDocument);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["value"], serde_json::Value::Null);
        assert_eq!(v["provenance"], "none");
        assert_eq!(v["confidence"], 0.0);
        assert_eq!(v["gated_reason"], "not_present_in_document");
    }

    #[test]
    fn strength_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(MismatchStrength::Unknown).unwrap(),
            serde_json::json!("UNKNOWN")
        );
    }
}
