use provena_core::Money;

use crate::result::{GatedReason, MismatchSignal, MismatchStrength, ReconciledAmount};
use crate::thresholds::*;

/// Line-item evidence behind the mismatch check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemsSupport {
    pub sum: Option<Money>,
    pub support: f32,
    /// Items were summed even though their own confidence is weak.
    pub used_raw: bool,
}

impl ItemsSupport {
    pub fn from_items(items: &[Money], confidence: f32) -> Self {
        // An overflowing sum is as unusable as no items at all.
        let sum = (!items.is_empty())
            .then(|| Money::checked_sum(items.iter().copied()))
            .flatten()
            .filter(|s| s.is_positive());
        Self {
            sum,
            support: confidence,
            used_raw: sum.is_some() && confidence < ITEMS_INCLUSION_THRESHOLD,
        }
    }
}

pub fn strength_for(ratio: f64) -> MismatchStrength {
    if ratio < MISMATCH_NONE_BELOW {
        MismatchStrength::None
    } else if ratio < MISMATCH_WEAK_BELOW {
        MismatchStrength::Weak
    } else if ratio <= MISMATCH_STRONG_ABOVE {
        MismatchStrength::Medium
    } else {
        MismatchStrength::Strong
    }
}

/// Compare items + tax against the reconciled total. The signal is only
/// applied when there is a real disagreement and every source behind it
/// (total, items, tax) clears the support bar.
pub fn compute_mismatch(
    total: &ReconciledAmount,
    items: &ItemsSupport,
    tax: &ReconciledAmount,
) -> MismatchSignal {
    let total_conf = total.confidence;
    let (Some(total), Some(items_sum)) = (total.value, items.sum) else {
        return MismatchSignal::not_computable();
    };
    if !total.is_positive() {
        return MismatchSignal::not_computable();
    }

    let Some(expected) = items_sum.checked_add(tax.value.unwrap_or_else(Money::zero)) else {
        return MismatchSignal::not_computable();
    };
    // Weakest link among the sources that fed the comparison.
    let mut support = total_conf.min(items.support);
    if tax.is_present() {
        support = support.min(tax.confidence);
    }
    let Some(ratio) = expected.relative_diff(total) else {
        return MismatchSignal::not_computable();
    };
    let strength = strength_for(ratio);

    let gated_reason = if strength == MismatchStrength::None {
        Some(GatedReason::NoMismatch)
    } else if support < MISMATCH_SUPPORT_THRESHOLD {
        Some(GatedReason::LowSupportConf)
    } else {
        None
    };

    MismatchSignal {
        computable: true,
        strength,
        ratio: Some(ratio),
        support: Some(support),
        applied_to_score: gated_reason.is_none(),
        gated_reason,
        expected_total: Some(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Provenance;

    fn total(cents: i64) -> ReconciledAmount {
        ReconciledAmount::found(Money::from_cents(cents), Provenance::Regex, 0.8)
    }

    #[test]
    fn strength_bands() {
        assert_eq!(strength_for(0.0), MismatchStrength::None);
        assert_eq!(strength_for(0.029), MismatchStrength::None);
        assert_eq!(strength_for(0.03), MismatchStrength::Weak);
        assert_eq!(strength_for(0.079), MismatchStrength::Weak);
        assert_eq!(strength_for(0.08), MismatchStrength::Medium);
        assert_eq!(strength_for(0.15), MismatchStrength::Medium);
        assert_eq!(strength_for(0.151), MismatchStrength::Strong);
    }

    #[test]
    fn empty_items_are_insufficient() {
        let items = ItemsSupport::from_items(&[], 0.9);
        let m = compute_mismatch(&total(1000), &items, &ReconciledAmount::missing(GatedReason::NoLabelFound));
        assert!(!m.computable);
        assert!(!m.applied_to_score);
        assert_eq!(m.gated_reason, Some(GatedReason::InsufficientComponents));
    }

    #[test]
    fn overflowing_items_or_tax_are_insufficient() {
        let huge = Money::parse("50,000,000,000,000,000,000,000,000,000.00").unwrap();
        let items = ItemsSupport::from_items(&[huge, huge], 0.9);
        assert_eq!(items.sum, None);
        let none = ReconciledAmount::missing(GatedReason::NoLabelFound);
        assert!(!compute_mismatch(&total(1000), &items, &none).computable);

        let items = ItemsSupport::from_items(&[huge], 0.9);
        let tax = ReconciledAmount::found(huge, Provenance::Regex, 0.9);
        let m = compute_mismatch(&total(1000), &items, &tax);
        assert_eq!(m.gated_reason, Some(GatedReason::InsufficientComponents));
    }

    #[test]
    fn agreement_is_gated_as_no_mismatch() {
        let items = ItemsSupport::from_items(&[Money::from_cents(4500)], 0.9);
        let tax = ReconciledAmount::found(Money::from_cents(360), Provenance::Regex, 0.7);
        let m = compute_mismatch(&total(4860), &items, &tax);
        assert!(m.computable);
        assert_eq!(m.strength, MismatchStrength::None);
        assert_eq!(m.gated_reason, Some(GatedReason::NoMismatch));
        assert!(!m.applied_to_score);
        assert_eq!(m.expected_total, Some(Money::from_cents(4860)));
    }

    #[test]
    fn strong_mismatch_with_support_is_applied() {
        let items = ItemsSupport::from_items(&[Money::from_cents(3000)], 0.8);
        let m = compute_mismatch(&total(5000), &items, &ReconciledAmount::missing(GatedReason::NoLabelFound));
        assert_eq!(m.strength, MismatchStrength::Strong);
        assert!(m.applied_to_score);
        assert_eq!(m.gated_reason, None);
    }

    #[test]
    fn strong_mismatch_with_weak_support_is_gated() {
        let items = ItemsSupport::from_items(&[Money::from_cents(3000)], 0.4);
        let m = compute_mismatch(&total(5000), &items, &ReconciledAmount::missing(GatedReason::NoLabelFound));
        assert_eq!(m.strength, MismatchStrength::Strong);
        assert!(!m.applied_to_score);
        assert_eq!(m.gated_reason, Some(GatedReason::LowSupportConf));
    }

    #[test]
    fn weak_total_source_gates_mismatch() {
        let items = ItemsSupport::from_items(&[Money::from_cents(3000)], 0.9);
        let weak_total = ReconciledAmount::found(Money::from_cents(5000), Provenance::Regex, 0.5);
        let m = compute_mismatch(&weak_total, &items, &ReconciledAmount::missing(GatedReason::NoLabelFound));
        assert_eq!(m.support, Some(0.5));
        assert_eq!(m.gated_reason, Some(GatedReason::LowSupportConf));
    }

    #[test]
    fn low_confidence_items_are_marked_raw() {
        let s = ItemsSupport::from_items(&[Money::from_cents(100), Money::from_cents(250)], 0.2);
        assert_eq!(s.sum, Some(Money::from_cents(350)));
        assert!(s.used_raw);
        let s = ItemsSupport::from_items(&[Money::from_cents(100)], 0.5);
        assert!(!s.used_raw);
    }
}
