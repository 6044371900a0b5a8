use provena_core::Money;

use crate::engine::DocumentScans;
use crate::input::ReconcileInput;
use crate::labels::{LabelScan, LabeledAmount};
use crate::result::{GatedReason, Provenance, ReconciledAmount};
use crate::thresholds::{LABELED_AMOUNT_CONFIDENCE, LEGACY_CONFIDENCE};

/// The non-total amount fields, each with its own source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    Subtotal,
    Tax,
    Discount,
    Tip,
}

impl AmountField {
    pub fn name(self) -> &'static str {
        match self {
            AmountField::Subtotal => "subtotal",
            AmountField::Tax => "tax",
            AmountField::Discount => "discount",
            AmountField::Tip => "tip",
        }
    }

    /// Reason for a null value when no label was seen at all.
    fn absent_reason(self) -> GatedReason {
        match self {
            AmountField::Subtotal | AmountField::Tax => GatedReason::NoLabelFound,
            AmountField::Discount | AmountField::Tip => GatedReason::NotPresentInDocument,
        }
    }

    fn scan(self, scans: &DocumentScans) -> &LabelScan {
        match self {
            AmountField::Subtotal => &scans.subtotal,
            AmountField::Tax => &scans.tax,
            AmountField::Discount => &scans.discount,
            AmountField::Tip => &scans.tip,
        }
    }

    fn aligned_value(self, input: &ReconcileInput) -> Option<Money> {
        let aligned = input.usable_aligned()?;
        match self {
            AmountField::Subtotal => aligned.subtotal,
            AmountField::Tax => aligned.tax,
            AmountField::Discount => aligned.discount,
            AmountField::Tip => aligned.tip,
        }
    }

    fn legacy_value(self, input: &ReconcileInput) -> Option<Money> {
        match self {
            AmountField::Subtotal => input.legacy.subtotal,
            AmountField::Discount => input.legacy.discount,
            AmountField::Tip => input.legacy.tip,
            AmountField::Tax => None,
        }
    }

    /// Discounts are printed either way round; store the magnitude.
    fn normalize(self, amount: Money) -> Option<Money> {
        match self {
            AmountField::Discount => Some(amount.abs()).filter(|a| !a.is_zero()),
            _ => Some(amount).filter(|a| !a.amount().is_sign_negative()),
        }
    }
}

/// Resolve one amount field: aligned columns, then the extraction/regex tier
/// (including the arithmetic solution when it matches the chosen total), then
/// legacy values, then null with a reason.
pub(crate) fn resolve_field(
    field: AmountField,
    input: &ReconcileInput,
    scans: &DocumentScans,
    total: &ReconciledAmount,
    trace: &mut Vec<String>,
) -> ReconciledAmount {
    let name = field.name();
    let ocr = input.ocr_factor();

    if let Some(v) = field.aligned_value(input).and_then(|v| field.normalize(v)) {
        let conf = input.usable_aligned().map(|a| a.confidence()).unwrap_or(0.0);
        trace.push(format!("{name}: aligned {v}"));
        return ReconciledAmount::found(v, Provenance::AlignedColumns, conf);
    }

    if field == AmountField::Tax {
        if let Some(extracted) = input.tax {
            if let Some(v) = field.normalize(extracted.amount) {
                trace.push(format!("{name}: extracted {v}"));
                return ReconciledAmount::found(v, Provenance::Regex, extracted.confidence * ocr);
            }
        }
    }

    let solution = scans.solution.filter(|s| total.value == Some(s.total));
    let solved = solution.and_then(|s| match field {
        AmountField::Subtotal => Some(s.subtotal),
        AmountField::Tax => s.tax,
        _ => None,
    });
    if let Some(v) = solved.and_then(|v| field.normalize(v)) {
        trace.push(format!("{name}: arithmetic solution {v}"));
        return ReconciledAmount::found(v, Provenance::Regex, LABELED_AMOUNT_CONFIDENCE * ocr);
    }

    let scan = field.scan(scans);
    if let Some(hit) = best_labeled(&scan.amounts, field) {
        trace.push(format!("{name}: labeled '{}' {}", hit.0.label, hit.1));
        let conf = if hit.0.next_line {
            LABELED_AMOUNT_CONFIDENCE - 0.1
        } else {
            LABELED_AMOUNT_CONFIDENCE
        };
        return ReconciledAmount::found(hit.1, Provenance::Regex, conf * ocr);
    }

    if let Some(v) = field.legacy_value(input).and_then(|v| field.normalize(v)) {
        trace.push(format!("{name}: kept existing {v}"));
        return ReconciledAmount::found(v, Provenance::Existing, LEGACY_CONFIDENCE);
    }

    let reason = if scan.label_seen() {
        GatedReason::LabelWithoutAmount
    } else {
        field.absent_reason()
    };
    trace.push(format!("{name}: none ({reason})"));
    ReconciledAmount::missing(reason)
}

/// Prefer same-line, formatted hits; among equals the last one printed.
fn best_labeled(hits: &[LabeledAmount], field: AmountField) -> Option<(&LabeledAmount, Money)> {
    hits.iter()
        .filter_map(|h| field.normalize(h.amount).map(|v| (h, v)))
        .max_by_key(|(h, _)| (!h.next_line, h.formatted, h.line_index))
}
