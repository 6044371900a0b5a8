use provena_core::{is_percentage_only, scan_amounts, Money};

use crate::engine::DocumentScans;
use crate::input::ReconcileInput;
use crate::result::{GatedReason, Provenance, ReconciledAmount};
use crate::thresholds::*;

/// A regex-tier total hypothesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalCandidate {
    pub amount: Money,
    pub score: f32,
    pub confidence: f32,
    pub formatted: bool,
}

/// One way of producing the total: a value or the reason it could not.
type TotalStrategy = fn(&ReconcileInput, &DocumentScans, &mut Vec<String>) -> Result<ReconciledAmount, &'static str>;

/// Tried in order; the first success wins.
const TOTAL_STRATEGIES: [(&str, TotalStrategy); 3] = [
    ("aligned", aligned_total),
    ("regex", regex_total),
    ("semantic_soft_fallback", semantic_soft_fallback),
];

pub(crate) fn resolve_total(
    input: &ReconcileInput,
    scans: &DocumentScans,
    trace: &mut Vec<String>,
) -> ReconciledAmount {
    for (name, strategy) in TOTAL_STRATEGIES {
        match strategy(input, scans, trace) {
            Ok(amount) => {
                trace.push(format!(
                    "total: {name} -> {} via {} (conf {:.2})",
                    amount.value.map(|v| v.to_string()).unwrap_or_default(),
                    amount.provenance,
                    amount.confidence
                ));
                return amount;
            }
            Err(reason) => trace.push(format!("total: {name} skipped ({reason})")),
        }
    }
    ReconciledAmount::missing(GatedReason::NoTotalSource)
}

fn agrees(a: Money, b: Money) -> bool {
    a.checked_sub(b)
        .is_some_and(|d| d.abs() <= Money::from_cents(CONFIRMATION_TOLERANCE_CENTS))
        || b.relative_diff(a).is_some_and(|r| r <= CONFIRMATION_TOLERANCE_RATIO)
}

fn aligned_total(
    input: &ReconcileInput,
    _scans: &DocumentScans,
    trace: &mut Vec<String>,
) -> Result<ReconciledAmount, &'static str> {
    let aligned = input.aligned.as_ref().ok_or("no_aligned_hint")?;
    if !aligned.hit {
        return Err("aligned_miss");
    }
    if !aligned.is_usable() {
        return Err("alignment_below_threshold");
    }
    let total = aligned.total.ok_or("aligned_total_missing")?;
    if total.is_zero() {
        return Err("aligned_total_zero");
    }
    if !total.is_positive() {
        return Err("aligned_total_negative");
    }

    let aligned_conf = aligned.confidence();
    let Some(semantic) = input.semantic else {
        return Ok(ReconciledAmount::found(total, Provenance::AlignedColumns, aligned_conf));
    };
    let Some(semantic_total) = semantic.usable_total() else {
        return Ok(ReconciledAmount::found(total, Provenance::AlignedColumns, aligned_conf));
    };

    if agrees(semantic_total, total) {
        let conf = (aligned_conf.max(semantic.confidence) + CONFIRMATION_BOOST)
            .min(MAX_CONFIRMED_CONFIDENCE);
        return Ok(ReconciledAmount::found(
            total,
            Provenance::AlignedConfirmedBySemantic,
            conf,
        ));
    }

    if semantic.confidence >= SEMANTIC_OVERRIDE_THRESHOLD && semantic.confidence > aligned_conf {
        trace.push(format!(
            "total: semantic {semantic_total} (conf {:.3}) overrides aligned {total} (conf {aligned_conf:.3})",
            semantic.confidence
        ));
        return Ok(ReconciledAmount::found(
            semantic_total,
            Provenance::SemanticSoftFallback,
            semantic.confidence,
        ));
    }

    trace.push(format!(
        "total: semantic {semantic_total} (conf {:.3}) disagrees, aligned {total} kept",
        semantic.confidence
    ));
    Ok(ReconciledAmount::found(total, Provenance::AlignedColumns, aligned_conf))
}

fn regex_total(
    input: &ReconcileInput,
    scans: &DocumentScans,
    trace: &mut Vec<String>,
) -> Result<ReconciledAmount, &'static str> {
    let naive = scans.total_candidates.first().ok_or("no_regex_total")?;
    let ocr = input.ocr_factor();

    let (chosen, boost) = match scans.solution {
        Some(solution) => {
            let chosen = scans
                .total_candidates
                .iter()
                .find(|c| c.amount == solution.total)
                .unwrap_or(naive);
            if chosen.amount != naive.amount {
                trace.push(format!(
                    "total: arithmetic consistency picked {} over top-scored {} (residual {:.4})",
                    chosen.amount, naive.amount, solution.residual
                ));
            }
            (chosen, ARITHMETIC_CONSISTENCY_BOOST)
        }
        None => (naive, 0.0),
    };

    let conf = ((chosen.confidence + boost) * ocr).min(MAX_REGEX_CONFIDENCE);
    if let Some(semantic_total) = input.semantic.and_then(|s| s.usable_total()) {
        if agrees(semantic_total, chosen.amount) {
            trace.push(format!("total: semantic agrees with regex total {}", chosen.amount));
        }
    }
    Ok(ReconciledAmount::found(chosen.amount, Provenance::Regex, conf))
}

fn semantic_soft_fallback(
    input: &ReconcileInput,
    _scans: &DocumentScans,
    _trace: &mut Vec<String>,
) -> Result<ReconciledAmount, &'static str> {
    let semantic = input.semantic.ok_or("no_semantic_hint")?;
    let total = semantic.usable_total().ok_or("semantic_total_missing")?;
    if semantic.confidence < SEMANTIC_SOFT_FALLBACK_THRESHOLD {
        return Err("semantic_below_soft_fallback_threshold");
    }
    Ok(ReconciledAmount::found(
        total,
        Provenance::SemanticSoftFallback,
        semantic.confidence,
    ))
}

/// Collect regex-tier total candidates: the extracted total (unless its line is
/// percentage-only) plus every amount found in a total-keyword window.
/// Currency-symbol or thousands-grouped amounts outrank bare digits.
pub(crate) fn regex_candidates(
    input: &ReconcileInput,
    scans: &DocumentScans,
    trace: &mut Vec<String>,
) -> Vec<TotalCandidate> {
    let mut out: Vec<TotalCandidate> = Vec::new();
    let line_count = input.lines.len().max(1) as f32;

    if let Some(extracted) = input.regex_total {
        let line = input.regex_line.as_deref().unwrap_or("");
        if is_percentage_only(line) {
            trace.push(format!("total: extracted total rejected, percentage-only line '{line}'"));
        } else if extracted.amount.is_positive() {
            let formatted = scan_amounts(line)
                .iter()
                .any(|t| t.formatted && t.value == extracted.amount);
            out.push(TotalCandidate {
                amount: extracted.amount,
                score: 1.0 + extracted.confidence + if formatted { 0.5 } else { 0.0 },
                confidence: extracted.confidence,
                formatted,
            });
        }
    }

    for hit in &scans.total.amounts {
        if !hit.amount.is_positive() {
            continue;
        }
        let strong_label = hit.label != "total";
        let score = 1.0
            + if hit.formatted { 0.5 } else { 0.0 }
            + if hit.next_line { 0.0 } else { 0.1 }
            + if strong_label { 0.2 } else { 0.0 }
            + 0.3 * (hit.line_index as f32 + 1.0) / line_count;
        let confidence = if hit.formatted {
            REGEX_FORMATTED_CONFIDENCE
        } else {
            REGEX_BARE_CONFIDENCE
        };
        merge_candidate(
            &mut out,
            TotalCandidate {
                amount: hit.amount,
                score,
                confidence,
                formatted: hit.formatted,
            },
        );
    }

    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.amount.cmp(&a.amount))
    });
    out
}

/// Same amount seen twice is corroboration, not a second candidate.
fn merge_candidate(out: &mut Vec<TotalCandidate>, c: TotalCandidate) {
    match out.iter_mut().find(|e| e.amount == c.amount) {
        Some(existing) => {
            existing.score = existing.score.max(c.score) + 0.2;
            existing.confidence = existing.confidence.max(c.confidence);
            existing.formatted |= c.formatted;
        }
        None => out.push(c),
    }
}
