use tracing::debug;

use provena_core::SCHEMA_VERSION;

use crate::arithmetic::{solve, AmountOption, Combination};
use crate::fields::{resolve_field, AmountField};
use crate::input::ReconcileInput;
use crate::labels::{scan_labeled, LabelScan, DISCOUNT, SUBTOTAL, TAX, TIP, TOTAL};
use crate::mismatch::{compute_mismatch, ItemsSupport};
use crate::result::ReconciliationResult;
use crate::total::{regex_candidates, resolve_total, TotalCandidate};

/// Keyword scans and the arithmetic solution, computed once per document.
#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentScans {
    pub total: LabelScan,
    pub subtotal: LabelScan,
    pub tax: LabelScan,
    pub discount: LabelScan,
    pub tip: LabelScan,
    pub total_candidates: Vec<TotalCandidate>,
    pub solution: Option<Combination>,
}

impl DocumentScans {
    pub(crate) fn build(input: &ReconcileInput, trace: &mut Vec<String>) -> Self {
        let lines = &input.lines;
        let mut scans = Self {
            total: scan_labeled(lines, &TOTAL),
            subtotal: scan_labeled(lines, &SUBTOTAL),
            tax: scan_labeled(lines, &TAX),
            discount: scan_labeled(lines, &DISCOUNT),
            tip: scan_labeled(lines, &TIP),
            ..Self::default()
        };
        scans.total_candidates = regex_candidates(input, &scans, trace);

        let totals: Vec<AmountOption> = scans
            .total_candidates
            .iter()
            .map(|c| AmountOption {
                amount: c.amount,
                score: c.score,
            })
            .collect();
        let subtotals: Vec<AmountOption> = scans
            .subtotal
            .amounts
            .iter()
            .map(|h| AmountOption {
                amount: h.amount,
                score: if h.formatted { 1.5 } else { 1.0 },
            })
            .chain(input.legacy.subtotal.map(|amount| AmountOption { amount, score: 0.5 }))
            .collect();
        let taxes: Vec<AmountOption> = input
            .tax
            .map(|t| AmountOption {
                amount: t.amount,
                score: 1.0 + t.confidence,
            })
            .into_iter()
            .chain(scans.tax.amounts.iter().map(|h| AmountOption {
                amount: h.amount,
                score: if h.formatted { 1.5 } else { 1.0 },
            }))
            .collect();

        scans.solution = solve(&totals, &subtotals, &taxes);
        if let Some(s) = &scans.solution {
            trace.push(format!(
                "arithmetic: {} + {} = {} (residual {:.4}, tax rate {:.3})",
                s.subtotal,
                s.tax.map(|t| t.to_string()).unwrap_or_else(|| "0.00".into()),
                s.total,
                s.residual,
                s.implied_tax_rate
            ));
        }
        scans
    }
}

/// Reconcile the financial fields of one document.
///
/// The total follows aligned columns, then the regex tier, then a semantic
/// soft fallback; the other fields have their own precedence. Every null
/// field carries a reason and every decision leaves a trace note.
pub fn reconcile(input: &ReconcileInput) -> ReconciliationResult {
    let mut trace = Vec::new();
    if let Some(q) = input.ocr_confidence {
        trace.push(format!("ocr: quality {q:.2}, factor {:.2}", input.ocr_factor()));
    }

    let scans = DocumentScans::build(input, &mut trace);
    let total = resolve_total(input, &scans, &mut trace);

    let tax = resolve_field(AmountField::Tax, input, &scans, &total, &mut trace);
    let subtotal = resolve_field(AmountField::Subtotal, input, &scans, &total, &mut trace);
    let discount = resolve_field(AmountField::Discount, input, &scans, &total, &mut trace);
    let tip = resolve_field(AmountField::Tip, input, &scans, &total, &mut trace);

    let items = ItemsSupport::from_items(&input.line_items, input.line_items_conf);
    if items.used_raw {
        trace.push(format!(
            "items: low-confidence items summed raw (conf {:.2})",
            items.support
        ));
    }
    let mismatch = compute_mismatch(&total, &items, &tax);
    trace.push(format!(
        "mismatch: {} applied={}{}",
        mismatch.strength,
        mismatch.applied_to_score,
        mismatch
            .gated_reason
            .map(|r| format!(" ({r})"))
            .unwrap_or_default()
    ));

    debug!(
        total = ?total.value,
        provenance = %total.provenance,
        confidence = total.confidence,
        mismatch = %mismatch.strength,
        "reconciled document"
    );

    ReconciliationResult {
        confidence: total.confidence,
        total,
        subtotal,
        tax,
        discount,
        tip,
        items_sum: items.sum,
        used_raw_items_sum: items.used_raw,
        mismatch,
        trace,
        schema_version: SCHEMA_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{AlignedHint, ScoredAmount, SemanticHint};
    use crate::result::{GatedReason, MismatchStrength, Provenance};
    use provena_core::Money;

    fn money(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn semantic_soft_fallback_at_063() {
        let input = ReconcileInput {
            semantic: Some(SemanticHint::new(Some(money(2599)), 0.63)),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.total.value, Some(money(2599)));
        assert_eq!(r.total.provenance, Provenance::SemanticSoftFallback);
        assert!((r.confidence - 0.63).abs() < 1e-6);
    }

    #[test]
    fn semantic_soft_fallback_when_aligned_missed() {
        let input = ReconcileInput {
            aligned: Some(AlignedHint {
                hit: false,
                total: Some(money(9900)),
                alignment_confidence: 0.9,
                ..Default::default()
            }),
            semantic: Some(SemanticHint::new(Some(money(2599)), 0.63)),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.total.value, Some(money(2599)));
        assert_eq!(r.total.provenance, Provenance::SemanticSoftFallback);
        assert!(r.trace.iter().any(|t| t.contains("aligned_miss")));
    }

    #[test]
    fn semantic_at_050_yields_no_total() {
        let input = ReconcileInput {
            semantic: Some(SemanticHint::new(Some(money(2599)), 0.50)),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.total.value, None);
        assert_eq!(r.total.provenance, Provenance::None);
        assert_eq!(r.total.confidence, 0.0);
        assert_eq!(r.total.gated_reason, Some(GatedReason::NoTotalSource));
    }

    #[test]
    fn aligned_retained_against_semantic_0644() {
        let input = ReconcileInput {
            aligned: Some(AlignedHint {
                hit: true,
                total: Some(money(4860)),
                alignment_confidence: 0.7,
                ..Default::default()
            }),
            semantic: Some(SemanticHint::new(Some(money(9999)), 0.644)),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.total.value, Some(money(4860)));
        assert_eq!(r.total.provenance, Provenance::AlignedColumns);
    }

    #[test]
    fn empty_items_mismatch_is_insufficient() {
        let input = ReconcileInput::from_lines(&["TOTAL $20.00"]);
        let r = reconcile(&input);
        assert!(!r.mismatch.computable);
        assert!(!r.mismatch.applied_to_score);
        assert_eq!(r.mismatch.gated_reason, Some(GatedReason::InsufficientComponents));
        assert_eq!(r.items_sum, None);
    }

    #[test]
    fn small_ratio_is_no_mismatch() {
        let input = ReconcileInput {
            lines: vec!["TOTAL $48.60".into()],
            line_items: vec![money(2000), money(2500)],
            line_items_conf: 0.9,
            tax: Some(ScoredAmount::new(money(360), 0.8)),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.mismatch.strength, MismatchStrength::None);
        assert_eq!(r.mismatch.gated_reason, Some(GatedReason::NoMismatch));
        assert!(!r.mismatch.applied_to_score);
    }

    #[test]
    fn strong_mismatch_applied_only_with_support() {
        let mut input = ReconcileInput {
            lines: vec!["TOTAL $100.00".into()],
            line_items: vec![money(5000)],
            line_items_conf: 0.8,
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.mismatch.strength, MismatchStrength::Strong);
        assert!(r.mismatch.applied_to_score);

        input.line_items_conf = 0.5;
        let r = reconcile(&input);
        assert_eq!(r.mismatch.strength, MismatchStrength::Strong);
        assert!(!r.mismatch.applied_to_score);
        assert_eq!(r.mismatch.gated_reason, Some(GatedReason::LowSupportConf));
    }

    #[test]
    fn full_receipt_reconciles_every_field() {
        let input = ReconcileInput {
            lines: [
                "CORNER MARKET",
                "Apples 20.00",
                "Bread 25.00",
                "Subtotal 45.00",
                "Sales Tax 8% 3.60",
                "Total $48.60",
                "Cash $50.00",
                "Change 1.40",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            line_items: vec![money(2000), money(2500)],
            line_items_conf: 0.8,
            ocr_confidence: Some(0.9),
            ..Default::default()
        };
        let r = reconcile(&input);
        assert_eq!(r.total.value, Some(money(4860)));
        assert_eq!(r.subtotal.value, Some(money(4500)));
        assert_eq!(r.tax.value, Some(money(360)));
        assert_eq!(r.discount.gated_reason, Some(GatedReason::NotPresentInDocument));
        assert_eq!(r.tip.gated_reason, Some(GatedReason::NotPresentInDocument));
        assert_eq!(r.items_sum, Some(money(4500)));
        assert_eq!(r.schema_version, SCHEMA_VERSION);
        assert!(!r.trace.is_empty());
    }

    #[test]
    fn null_fields_always_carry_reason() {
        let r = reconcile(&ReconcileInput::default());
        for field in [&r.total, &r.subtotal, &r.tax, &r.discount, &r.tip] {
            assert!(field.value.is_none());
            assert!(field.gated_reason.is_some());
            assert_eq!(field.confidence, 0.0);
        }
    }

    #[test]
    fn amounts_near_decimal_limit_do_not_panic() {
        let huge = "$50,000,000,000,000,000,000,000,000,000.00";
        let mut input = ReconcileInput::from_lines(&[
            format!("Subtotal {huge}"),
            format!("Tax {huge}"),
            "Total $10.00".to_string(),
        ]);
        let r = reconcile(&input);
        assert_eq!(r.total.value, Some(money(1000)));
        assert!(!r.mismatch.computable);
        assert_eq!(r.mismatch.gated_reason, Some(GatedReason::InsufficientComponents));
        assert!(r.to_map().is_ok());

        let big = Money::parse(huge).unwrap();
        input.line_items = vec![big, big];
        input.line_items_conf = 0.9;
        let r = reconcile(&input);
        assert_eq!(r.items_sum, None);
        assert_eq!(r.mismatch.strength, MismatchStrength::Unknown);
        for field in [&r.total, &r.subtotal, &r.tax, &r.discount, &r.tip] {
            assert_eq!(field.value.is_none(), field.gated_reason.is_some());
        }
    }

    #[test]
    fn result_survives_map_round_trip() {
        let input = ReconcileInput {
            lines: vec!["Subtotal 10.00".into(), "Total $10.80".into()],
            tax: Some(ScoredAmount::new(money(80), 0.7)),
            line_items: vec![money(1000)],
            line_items_conf: 0.9,
            ..Default::default()
        };
        let r = reconcile(&input);
        let map = r.to_map().unwrap();
        assert_eq!(map["total"]["provenance"], "regex");
        assert_eq!(map["mismatch"]["strength"], "NONE");
        let back = ReconciliationResult::from_map(map).unwrap();
        assert_eq!(back, r);
    }
}
