//! Turns ranked candidates into one [`EntityResult`].
//!
//! Confidence comes from the winner's score, its margin over the runner-up and
//! the number of distinct proposals, then is capped by every demotion that
//! applies. The lowest cap wins.

use std::collections::HashMap;

use tracing::debug;

use provena_core::{clamp_confidence, ConfidenceBucket, Evidence, SCHEMA_VERSION};

use crate::candidate::Candidate;
use crate::entity::{Entity, EntityResult};

/// Floor for any result that has a value, so "found" never reads as "absent".
pub const MIN_FOUND_CONFIDENCE: f32 = 0.01;
/// No label names a numeric or layout-derived value.
pub const UNLABELED_NUMERIC_CAP: f32 = 0.55;
/// No label names a keyword-only value.
pub const UNLABELED_KEYWORD_CAP: f32 = 0.40;
/// Runner-up within this score gap of the winner.
pub const MULTI_CANDIDATE_GAP: f32 = 0.15;
pub const MULTI_CANDIDATE_CAP: f32 = 0.70;
pub const ZERO_VALUE_CAP: f32 = 0.10;

const SCORE_SCALE: f32 = 1.5;
const MARGIN_SCALE: f32 = 1.0;
const CROWD_PENALTY: f32 = 0.05;

pub fn resolve(entity: Entity, candidates: Vec<Candidate>, mut evidence: Evidence) -> EntityResult {
    let total_candidates = candidates.len();
    let mut viable: Vec<Candidate> = candidates.into_iter().filter(|c| c.score > 0.0).collect();
    let filtered_candidates = viable.len();
    sort_ranked(&mut viable);
    let ranked = collapse_duplicates(viable);

    evidence.insert("total_candidates", total_candidates);
    evidence.insert("filtered_candidates", filtered_candidates);
    evidence.insert("distinct_candidates", ranked.len());

    let Some(winner) = ranked.first() else {
        evidence.insert("winner_margin", 0.0f64);
        evidence.insert("caps_applied", Vec::<&str>::new());
        return EntityResult {
            entity,
            value: None,
            confidence: 0.0,
            bucket: ConfidenceBucket::None,
            candidates: ranked,
            evidence,
            schema_version: SCHEMA_VERSION,
        };
    };

    let runner_up = ranked.get(1).map(|c| c.score);
    let margin = runner_up.map_or(winner.score, |r| winner.score - r);

    let strength = 1.0 - (-winner.score / SCORE_SCALE).exp();
    let separation = 0.7 + 0.3 * (margin / MARGIN_SCALE).clamp(0.0, 1.0);
    let crowd = 1.0 / (1.0 + CROWD_PENALTY * (ranked.len() - 1) as f32);
    let raw = clamp_confidence(strength * separation * crowd);

    let mut caps: Vec<(&str, f32)> = Vec::new();
    if !winner.labeled {
        let cap = if entity.is_keyword_only() {
            UNLABELED_KEYWORD_CAP
        } else {
            UNLABELED_NUMERIC_CAP
        };
        caps.push(("unlabeled", cap));
    }
    if runner_up.is_some() && margin <= MULTI_CANDIDATE_GAP {
        caps.push(("multi_candidate", MULTI_CANDIDATE_CAP));
    }
    if winner.value.is_zero_or_empty() {
        caps.push(("zero_value", ZERO_VALUE_CAP));
    }

    let capped = caps.iter().fold(raw, |c, (_, cap)| c.min(*cap));
    let confidence = clamp_confidence(capped).max(MIN_FOUND_CONFIDENCE);

    evidence.insert("winner_margin", margin as f64);
    evidence.insert("winner_score", winner.score as f64);
    evidence.insert("runner_up_score", runner_up.map(f64::from));
    evidence.insert("raw_confidence", raw as f64);
    evidence.insert("caps_applied", caps.iter().map(|(n, _)| *n).collect::<Vec<_>>());
    evidence.insert("winner_labeled", winner.labeled);
    evidence.insert("winner_zone", winner.zone);
    evidence.insert("duplicate_count", winner.duplicate_count);

    debug!(
        entity = entity.as_str(),
        value = %winner.value,
        score = winner.score,
        margin,
        confidence,
        "resolved entity"
    );

    EntityResult {
        entity,
        value: Some(winner.value.clone()),
        confidence,
        bucket: ConfidenceBucket::from_confidence(confidence),
        candidates: ranked,
        evidence,
        schema_version: SCHEMA_VERSION,
    }
}

fn sort_ranked(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.line_index.cmp(&b.line_index))
    });
}

/// Keep the best-scored candidate per value. Input must already be ranked.
fn collapse_duplicates(ranked: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Candidate> = Vec::new();
    for c in ranked {
        match seen.get(&c.normalized_text) {
            Some(&i) => {
                let kept = &mut out[i];
                kept.duplicate_count += 1;
                kept.labeled |= c.labeled;
                for k in c.matched_keywords {
                    kept.keyword(&k);
                }
            }
            None => {
                seen.insert(c.normalized_text.clone(), out.len());
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use rust_decimal::Decimal;

    fn doc() -> Document {
        Document::from_lines(&["a", "b", "c", "d"])
    }

    fn cand(value: &str, score: f32, labeled: bool, line: usize) -> Candidate {
        let mut c = Candidate::new(&doc(), value, "test", line, value);
        c.adjust("base", score);
        c.labeled = labeled;
        c
    }

    #[test]
    fn no_candidates_gives_schema_complete_null() {
        let r = resolve(Entity::Merchant, Vec::new(), Evidence::new());
        assert_eq!(r.value, None);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.bucket, ConfidenceBucket::None);
        for key in ["total_candidates", "filtered_candidates", "winner_margin"] {
            assert!(r.evidence.has(key), "missing {key}");
        }
    }

    #[test]
    fn non_positive_scores_are_filtered() {
        let r = resolve(Entity::Merchant, vec![cand("X", -1.0, true, 0)], Evidence::new());
        assert_eq!(r.value, None);
        assert_eq!(r.evidence.get_f64("total_candidates"), Some(1.0));
        assert_eq!(r.evidence.get_f64("filtered_candidates"), Some(0.0));
    }

    #[test]
    fn unlabeled_numeric_is_capped() {
        let mut c = Candidate::new(&doc(), Decimal::new(1250, 2), "test", 3, "12.50");
        c.adjust("base", 5.0);
        let r = resolve(Entity::Total, vec![c], Evidence::new());
        assert!(r.confidence <= UNLABELED_NUMERIC_CAP);
        assert!(r.confidence > 0.0);
    }

    #[test]
    fn unlabeled_keyword_only_is_capped_lower() {
        let r = resolve(Entity::PaymentMethod, vec![cand("Visa", 5.0, false, 0)], Evidence::new());
        assert!(r.confidence <= UNLABELED_KEYWORD_CAP);
    }

    #[test]
    fn near_tie_caps_at_medium() {
        let r = resolve(
            Entity::Merchant,
            vec![cand("ALPHA", 4.0, true, 0), cand("BETA", 3.9, true, 1)],
            Evidence::new(),
        );
        assert!(r.confidence <= MULTI_CANDIDATE_CAP);
        let caps = r.evidence.get("caps_applied").unwrap();
        assert!(caps.as_array().unwrap().iter().any(|c| c == "multi_candidate"));
    }

    #[test]
    fn duplicates_do_not_count_as_ambiguity() {
        let r = resolve(
            Entity::Merchant,
            vec![cand("ALPHA", 4.0, true, 0), cand("alpha", 3.95, false, 2)],
            Evidence::new(),
        );
        assert_eq!(r.candidates.len(), 1);
        assert_eq!(r.candidates[0].duplicate_count, 1);
        assert!(r.confidence > MULTI_CANDIDATE_CAP);
    }

    #[test]
    fn zero_value_is_capped_very_low() {
        let mut c = Candidate::new(&doc(), Decimal::ZERO, "test", 3, "0.00");
        c.adjust("base", 5.0);
        c.labeled = true;
        let r = resolve(Entity::Total, vec![c], Evidence::new());
        assert!(r.confidence <= ZERO_VALUE_CAP);
        assert!(r.value.is_some());
        assert!(r.confidence > 0.0);
    }

    #[test]
    fn strong_labeled_winner_is_high() {
        let r = resolve(
            Entity::Merchant,
            vec![cand("ALPHA", 4.0, true, 0), cand("BETA", 1.0, false, 1)],
            Evidence::new(),
        );
        assert_eq!(r.bucket, ConfidenceBucket::High);
        assert_eq!(r.value.unwrap().as_text(), Some("ALPHA"));
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        for score in [0.001f32, 0.5, 3.0, 100.0, f32::MAX] {
            let r = resolve(Entity::Date, vec![cand("2024-01-01", score, true, 0)], Evidence::new());
            assert!((0.0..=1.0).contains(&r.confidence));
            assert!(r.confidence > 0.0);
        }
    }
}
