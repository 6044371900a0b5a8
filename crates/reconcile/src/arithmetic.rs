use provena_core::Money;

use crate::thresholds::{ARITHMETIC_TOLERANCE, MAX_IMPLIED_TAX_RATE};

/// A candidate amount with the score it earned in the keyword scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountOption {
    pub amount: Money,
    pub score: f32,
}

/// A (total, subtotal, tax) triple that adds up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combination {
    pub total: Money,
    pub subtotal: Money,
    /// `None` when the subtotal alone explains the total.
    pub tax: Option<Money>,
    /// |subtotal + tax - total| / total
    pub residual: f64,
    pub implied_tax_rate: f64,
    pub score: f32,
}

/// Pick the lowest-residual combination with |subtotal + tax - total| / total
/// within tolerance and a plausible implied tax rate. Ties go to the higher
/// combined score. Returns `None` when nothing is consistent.
pub fn solve(
    totals: &[AmountOption],
    subtotals: &[AmountOption],
    taxes: &[AmountOption],
) -> Option<Combination> {
    let mut best: Option<Combination> = None;

    let tax_options: Vec<Option<AmountOption>> = taxes
        .iter()
        .map(|t| Some(*t))
        .chain(std::iter::once(None))
        .collect();

    for total in totals.iter().filter(|t| t.amount.is_positive()) {
        for subtotal in subtotals.iter().filter(|s| s.amount.is_positive()) {
            for tax in &tax_options {
                let tax_amount = tax.map(|t| t.amount).unwrap_or_else(Money::zero);
                if tax_amount.amount().is_sign_negative() {
                    continue;
                }
                let Some(residual) = subtotal
                    .amount
                    .checked_add(tax_amount)
                    .and_then(|sum| sum.relative_diff(total.amount))
                else {
                    continue;
                };
                if residual > ARITHMETIC_TOLERANCE {
                    continue;
                }
                let implied_tax_rate = ratio(tax_amount, subtotal.amount);
                if implied_tax_rate > MAX_IMPLIED_TAX_RATE {
                    continue;
                }

                let score = total.score + subtotal.score + tax.map(|t| t.score).unwrap_or(0.0);
                let candidate = Combination {
                    total: total.amount,
                    subtotal: subtotal.amount,
                    tax: tax.map(|t| t.amount),
                    residual,
                    implied_tax_rate,
                    score,
                };
                if is_better(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
    }

    best
}

fn ratio(part: Money, whole: Money) -> f64 {
    if whole.is_zero() {
        return f64::INFINITY;
    }
    part.to_f64() / whole.to_f64()
}

fn is_better(candidate: &Combination, current: Option<&Combination>) -> bool {
    let Some(current) = current else { return true };
    const EPS: f64 = 1e-9;
    if candidate.residual + EPS < current.residual {
        return true;
    }
    if (candidate.residual - current.residual).abs() <= EPS {
        // Prefer a combination that accounts for tax explicitly, then the higher score.
        if candidate.tax.is_some() != current.tax.is_some() {
            return candidate.tax.is_some();
        }
        return candidate.score > current.score;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(cents: i64, score: f32) -> AmountOption {
        AmountOption {
            amount: Money::from_cents(cents),
            score,
        }
    }

    #[test]
    fn prefers_consistent_combination_over_naive_top() {
        // The naive winner (50.00) is a "cash tendered" style number.
        let totals = [opt(5000, 2.0), opt(4860, 1.5)];
        let subtotals = [opt(4500, 1.0)];
        let taxes = [opt(360, 1.0)];
        let c = solve(&totals, &subtotals, &taxes).unwrap();
        assert_eq!(c.total, Money::from_cents(4860));
        assert_eq!(c.tax, Some(Money::from_cents(360)));
        assert!(c.residual < 1e-9);
        assert!((c.implied_tax_rate - 0.08).abs() < 1e-9);
    }

    #[test]
    fn rejects_implausible_tax_rate() {
        // 60 + 40 = 100 adds up but implies a 66% tax rate.
        let c = solve(&[opt(10000, 1.0)], &[opt(6000, 1.0)], &[opt(4000, 1.0)]);
        assert!(c.is_none());
    }

    #[test]
    fn tolerates_small_rounding_residual() {
        // 45.00 + 3.60 = 48.60 vs printed 49.00 -> ~0.8% residual.
        let c = solve(&[opt(4900, 1.0)], &[opt(4500, 1.0)], &[opt(360, 1.0)]).unwrap();
        assert!(c.residual > 0.0 && c.residual <= ARITHMETIC_TOLERANCE);
    }

    #[test]
    fn residual_beyond_tolerance_is_inconsistent() {
        assert!(solve(&[opt(6000, 1.0)], &[opt(4500, 1.0)], &[opt(360, 1.0)]).is_none());
    }

    #[test]
    fn subtotal_alone_can_explain_total() {
        let c = solve(&[opt(2000, 1.0)], &[opt(2000, 1.0)], &[]).unwrap();
        assert_eq!(c.tax, None);
        assert_eq!(c.implied_tax_rate, 0.0);
    }

    #[test]
    fn lowest_residual_wins() {
        let totals = [opt(4870, 3.0), opt(4860, 1.0)];
        let c = solve(&totals, &[opt(4500, 1.0)], &[opt(360, 1.0)]).unwrap();
        assert_eq!(c.total, Money::from_cents(4860));
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(solve(&[], &[], &[]).is_none());
        assert!(solve(&[opt(100, 1.0)], &[], &[]).is_none());
    }
}
