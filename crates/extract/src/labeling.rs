//! Flat projection of an [`EntityResult`] for building labeled training data.
//! Computed on demand; never stored inside the result itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use provena_core::{ConfidenceBucket, EntityValue};

use crate::entity::{Entity, EntityResult};

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub rank: usize,
    pub value: EntityValue,
    pub score: f32,
    pub source: String,
    pub line_index: usize,
    pub labeled: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelingRecord {
    pub entity: Entity,
    pub winner: Option<EntityValue>,
    pub confidence: f32,
    pub bucket: ConfidenceBucket,
    pub top_candidates: Vec<CandidateSummary>,
    pub rejection_counts: BTreeMap<String, u64>,
    pub flags: BTreeMap<String, bool>,
    /// Filled in by a human reviewer.
    pub human_label: Option<EntityValue>,
    pub human_verified: Option<bool>,
    pub schema_version: u32,
}

impl EntityResult {
    pub fn to_labeling(&self, top_k: usize) -> LabelingRecord {
        let top_candidates = self
            .candidates
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, c)| CandidateSummary {
                rank: rank + 1,
                value: c.value.clone(),
                score: c.score,
                source: c.source.clone(),
                line_index: c.line_index,
                labeled: c.labeled,
                reasons: c.reasons.clone(),
            })
            .collect();

        let mut rejection_counts: BTreeMap<String, u64> = self
            .evidence
            .get("rejections")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default();
        let total = self.evidence.get_f64("total_candidates").unwrap_or(0.0);
        let filtered = self.evidence.get_f64("filtered_candidates").unwrap_or(0.0);
        let scored_out = (total - filtered).max(0.0) as u64;
        if scored_out > 0 {
            rejection_counts.insert("non_positive_score".to_string(), scored_out);
        }

        let caps: Vec<String> = self
            .evidence
            .get("caps_applied")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|c| c.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let calibrated = self
            .calibration()
            .is_some_and(|meta| meta.applied);

        let flags = BTreeMap::from([
            ("has_value".to_string(), self.value.is_some()),
            (
                "winner_labeled".to_string(),
                self.winner().is_some_and(|c| c.labeled),
            ),
            ("multi_candidate".to_string(), self.candidates.len() > 1),
            ("capped".to_string(), !caps.is_empty()),
            ("ambiguous".to_string(), caps.iter().any(|c| c == "multi_candidate")),
            ("calibrated".to_string(), calibrated),
        ]);

        LabelingRecord {
            entity: self.entity,
            winner: self.value.clone(),
            confidence: self.confidence,
            bucket: self.bucket,
            top_candidates,
            rejection_counts,
            flags,
            human_label: None,
            human_verified: None,
            schema_version: self.schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn projection_has_top_k_and_placeholders() {
        let doc = Document::from_text("SHOP\n$1.00\n$2.00\n$3.00\nTotal $4.00\n(555) 123-4567");
        let r = crate::amounts::extract_total(&doc);
        let rec = r.to_labeling(2);
        assert_eq!(rec.top_candidates.len(), 2);
        assert_eq!(rec.top_candidates[0].rank, 1);
        assert_eq!(rec.winner, r.value);
        assert_eq!(rec.human_label, None);
        assert_eq!(rec.human_verified, None);
        assert_eq!(rec.flags["has_value"], true);
        assert_eq!(rec.flags["winner_labeled"], true);
    }

    #[test]
    fn rejection_counts_come_from_evidence() {
        let doc = Document::from_text("(555) 123-4567\nWHOLE FOODS");
        let r = crate::merchant::extract(&doc);
        let rec = r.to_labeling(DEFAULT_TOP_K);
        assert_eq!(rec.rejection_counts.get("phone"), Some(&1));
    }

    #[test]
    fn empty_result_projects_cleanly() {
        let r = crate::payment::extract(&Document::from_text("nothing here"));
        let rec = r.to_labeling(DEFAULT_TOP_K);
        assert!(rec.top_candidates.is_empty());
        assert_eq!(rec.flags["has_value"], false);
        assert_eq!(rec.bucket, ConfidenceBucket::None);
    }
}
