use serde::{Deserialize, Serialize};

use provena_core::{clamp_confidence, Money};

use crate::thresholds::MIN_ALIGNMENT_CONFIDENCE;

/// An amount with the confidence of whatever produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredAmount {
    pub amount: Money,
    pub confidence: f32,
}

impl ScoredAmount {
    pub fn new(amount: Money, confidence: f32) -> Self {
        Self {
            amount,
            confidence: clamp_confidence(confidence),
        }
    }
}

/// Column-aligned layout reading of the summary block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedHint {
    pub hit: bool,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub tip: Option<Money>,
    pub alignment_confidence: f32,
    #[serde(default)]
    pub labels_found: Vec<String>,
}

impl AlignedHint {
    /// A hit whose alignment is trustworthy enough to read any field from.
    pub fn is_usable(&self) -> bool {
        self.hit && clamp_confidence(self.alignment_confidence) >= MIN_ALIGNMENT_CONFIDENCE
    }

    pub fn confidence(&self) -> f32 {
        clamp_confidence(self.alignment_confidence)
    }
}

/// Total proposed by a semantic (LLM) reader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticHint {
    pub total_amount: Option<Money>,
    pub confidence: f32,
}

impl SemanticHint {
    pub fn new(total_amount: Option<Money>, confidence: f32) -> Self {
        Self {
            total_amount,
            confidence: clamp_confidence(confidence),
        }
    }

    /// A positive total, if any.
    pub fn usable_total(&self) -> Option<Money> {
        self.total_amount.filter(|t| t.is_positive())
    }
}

/// Values carried over from an earlier extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyAmounts {
    pub subtotal: Option<Money>,
    pub discount: Option<Money>,
    pub tip: Option<Money>,
}

/// Everything reconciliation looks at for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileInput {
    /// Normalized document lines, in reading order.
    pub lines: Vec<String>,
    /// Total chosen by entity extraction, if any.
    pub regex_total: Option<ScoredAmount>,
    /// The line the extracted total came from.
    pub regex_line: Option<String>,
    pub line_items: Vec<Money>,
    pub line_items_conf: f32,
    pub tax: Option<ScoredAmount>,
    pub semantic: Option<SemanticHint>,
    /// Scalar OCR quality in `[0, 1]`.
    pub ocr_confidence: Option<f32>,
    pub aligned: Option<AlignedHint>,
    #[serde(default)]
    pub legacy: LegacyAmounts,
}

impl ReconcileInput {
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn usable_aligned(&self) -> Option<&AlignedHint> {
        self.aligned.as_ref().filter(|a| a.is_usable())
    }

    /// Multiplier applied to confidences derived from OCR text.
    pub(crate) fn ocr_factor(&self) -> f32 {
        self.ocr_confidence
            .map(|q| 0.6 + 0.4 * clamp_confidence(q))
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_needs_hit_and_confidence() {
        let mut a = AlignedHint {
            hit: true,
            alignment_confidence: 0.8,
            ..Default::default()
        };
        assert!(a.is_usable());
        a.alignment_confidence = 0.59;
        assert!(!a.is_usable());
        a.alignment_confidence = 0.9;
        a.hit = false;
        assert!(!a.is_usable());
    }

    #[test]
    fn ocr_factor_scales_low_quality() {
        let mut input = ReconcileInput::default();
        assert_eq!(input.ocr_factor(), 1.0);
        input.ocr_confidence = Some(0.0);
        assert!((input.ocr_factor() - 0.6).abs() < 1e-6);
        input.ocr_confidence = Some(1.0);
        assert!((input.ocr_factor() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn semantic_ignores_non_positive_totals() {
        assert_eq!(SemanticHint::new(Some(Money::zero()), 0.9).usable_total(), None);
        assert_eq!(
            SemanticHint::new(Some(Money::from_cents(500)), 0.9).usable_total(),
            Some(Money::from_cents(500))
        );
    }
}
