use provena_core::{is_percentage_only, scan_amounts, AmountToken, Evidence};
use provena_reconcile::labels::{LabelSet, TAX, TOTAL};

use crate::candidate::{Candidate, Rejections, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::re_percent;
use crate::resolve::resolve;

/// Phrases that put a total-looking amount on the wrong line.
const TOTAL_CONFLICTS: Vocabulary = Vocabulary {
    labels: &[],
    conflicts: &[
        "subtotal",
        "sub total",
        "sub-total",
        "change",
        "change due",
        "tendered",
        "cash tendered",
        "amount tendered",
        "you saved",
        "savings",
        "tax",
        "tip",
        "gratuity",
        "discount",
        "previous balance",
        "points",
    ],
};

const TAX_CONFLICTS: Vocabulary = Vocabulary {
    labels: &[],
    conflicts: &[
        "tax id",
        "tax no",
        "tax number",
        "vat no",
        "vat reg",
        "vat number",
        "gst no",
        "gst reg",
        "hst no",
        "before tax",
        "pre-tax",
        "excl",
        "total",
        "subtotal",
    ],
};

/// Scoring knobs shared by the amount entities.
struct AmountProfile {
    entity: Entity,
    labels: LabelSet,
    conflicts: Vocabulary,
    label_bonus: f32,
    /// Weight of the page position bonus; totals sit low on the page.
    position_weight: f32,
    largest_bonus: f32,
}

const TOTAL_PROFILE: AmountProfile = AmountProfile {
    entity: Entity::Total,
    labels: TOTAL,
    conflicts: TOTAL_CONFLICTS,
    label_bonus: 1.5,
    position_weight: 0.3,
    largest_bonus: 0.2,
};

const TAX_PROFILE: AmountProfile = AmountProfile {
    entity: Entity::Tax,
    labels: TAX,
    conflicts: TAX_CONFLICTS,
    label_bonus: 1.5,
    position_weight: 0.1,
    largest_bonus: 0.0,
};

/// The amount payable.
pub fn extract_total(doc: &Document) -> EntityResult {
    extract_amount(doc, &TOTAL_PROFILE)
}

/// Tax charged. The rate printed next to it, if any, goes into evidence.
pub fn extract_tax(doc: &Document) -> EntityResult {
    let mut result = extract_amount(doc, &TAX_PROFILE);
    let rate = result
        .winner()
        .and_then(|c| re_percent().captures(&c.raw_text))
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok());
    result.evidence.insert("tax_rate_percent", rate);
    result
}

fn extract_amount(doc: &Document, profile: &AmountProfile) -> EntityResult {
    let mut rejections = Rejections::new();
    let mut candidates = Vec::new();

    let largest = doc
        .iter()
        .flat_map(|(_, l)| scan_amounts(l))
        .filter(AmountToken::is_monetary)
        .map(|t| t.value)
        .max();

    for (i, line) in doc.iter() {
        let label = profile.labels.match_line(line).map(|(l, _)| l);
        let bare_label_above = if label.is_none() {
            i.checked_sub(1)
                .and_then(|p| doc.line(p))
                .filter(|prev| !has_monetary(prev))
                .and_then(|prev| profile.labels.match_line(prev))
                .map(|(l, _)| l)
        } else {
            None
        };

        let tokens: Vec<AmountToken> = scan_amounts(line);
        if tokens.is_empty() {
            continue;
        }
        if is_percentage_only(line) {
            rejections.record("percentage_only");
            continue;
        }

        let monetary: Vec<&AmountToken> = tokens.iter().filter(|t| t.is_monetary()).collect();
        for t in &tokens {
            if t.is_percent {
                rejections.record("percentage");
            } else if !t.is_monetary() {
                rejections.record("bare_number");
            }
        }
        let Some(rightmost) = monetary.last().map(|t| t.start) else {
            continue;
        };

        for t in monetary {
            if t.value.amount().is_sign_negative() {
                rejections.record("negative");
                continue;
            }
            let mut c = Candidate::new(doc, t.value, "amount_token", i, line);
            c.adjust("base", 0.5);
            if t.formatted {
                c.adjust("formatted", 0.3).reason("formatted");
            }
            let pos = doc.relative_position(i);
            c.adjust("position", profile.position_weight * pos);
            c.zone_adjust(-0.3, 0.0, 0.2);
            if largest == Some(t.value) && profile.largest_bonus > 0.0 {
                c.adjust("largest_amount", profile.largest_bonus).reason("largest_amount");
            }

            // Only the rightmost amount on a labeled line is what the label names.
            let is_rightmost = t.start == rightmost;
            if let (Some(l), true) = (label, is_rightmost) {
                c.label(l, profile.label_bonus);
                c.source = "labeled_line".into();
            } else if let (Some(l), true) = (bare_label_above, is_rightmost) {
                c.label(l, profile.label_bonus * 0.8);
                c.reason("label_previous_line");
                c.source = "labeled_next_line".into();
            } else if label.is_some() {
                c.adjust("not_rightmost", -0.3);
            }

            if let Some(conflict) = profile.conflicts.conflict_in(line) {
                c.keyword(conflict);
                c.adjust("conflicting_label", -1.5);
            }
            candidates.push(c);
        }
    }

    let evidence = Evidence::new().with("rejections", rejections.counts());
    resolve(profile.entity, candidates, evidence)
}

fn has_monetary(line: &str) -> bool {
    scan_amounts(line).iter().any(AmountToken::is_monetary)
}
