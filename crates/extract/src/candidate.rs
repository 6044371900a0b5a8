use serde::{Deserialize, Serialize};

use provena_core::EntityValue;

use crate::document::{Document, Zone};

/// A named score contribution. Negative deltas are penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub name: String,
    pub delta: f32,
}

/// One scored hypothesis for an entity's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: EntityValue,
    pub score: f32,
    /// Which pattern produced it.
    pub source: String,
    pub line_index: usize,
    pub raw_text: String,
    pub normalized_text: String,
    pub reasons: Vec<String>,
    pub zone: Zone,
    pub adjustments: Vec<Adjustment>,
    pub matched_keywords: Vec<String>,
    /// An explicit label names this value.
    pub labeled: bool,
    /// Same value proposed elsewhere in the document, collapsed into this one.
    #[serde(default)]
    pub duplicate_count: usize,
}

impl Candidate {
    pub fn new(
        doc: &Document,
        value: impl Into<EntityValue>,
        source: &str,
        line_index: usize,
        raw_text: &str,
    ) -> Self {
        let value = value.into();
        Self {
            normalized_text: value.normalized_key(),
            value,
            score: 0.0,
            source: source.to_string(),
            line_index,
            raw_text: raw_text.to_string(),
            reasons: Vec::new(),
            zone: doc.zone(line_index),
            adjustments: Vec::new(),
            matched_keywords: Vec::new(),
            labeled: false,
            duplicate_count: 0,
        }
    }

    /// Add a named contribution to the score.
    pub fn adjust(&mut self, name: &str, delta: f32) -> &mut Self {
        self.score += delta;
        self.adjustments.push(Adjustment {
            name: name.to_string(),
            delta,
        });
        self
    }

    pub fn reason(&mut self, reason: &str) -> &mut Self {
        if !self.reasons.iter().any(|r| r == reason) {
            self.reasons.push(reason.to_string());
        }
        self
    }

    /// Record an explicit label and apply its bonus.
    pub fn label(&mut self, keyword: &str, bonus: f32) -> &mut Self {
        self.labeled = true;
        self.keyword(keyword);
        self.adjust("label", bonus)
    }

    pub fn keyword(&mut self, keyword: &str) -> &mut Self {
        if !self.matched_keywords.iter().any(|k| k == keyword) {
            self.matched_keywords.push(keyword.to_string());
        }
        self
    }

    /// Apply the zone bonus or penalty from a per-entity table.
    pub fn zone_adjust(&mut self, header: f32, body: f32, footer: f32) -> &mut Self {
        let delta = match self.zone {
            Zone::Header => header,
            Zone::Body => body,
            Zone::Footer => footer,
        };
        if delta != 0.0 {
            let name = format!("zone_{}", self.zone);
            self.adjust(&name, delta);
        }
        self
    }
}

/// Label/conflict vocabulary for one entity.
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub labels: &'static [&'static str],
    pub conflicts: &'static [&'static str],
}

impl Vocabulary {
    pub fn label_in(&self, line: &str) -> Option<&'static str> {
        let lower = line.to_lowercase();
        self.labels
            .iter()
            .copied()
            .find(|l| provena_reconcile::labels::contains_label(&lower, l))
    }

    pub fn conflict_in(&self, line: &str) -> Option<&'static str> {
        let lower = line.to_lowercase();
        self.conflicts
            .iter()
            .copied()
            .find(|l| provena_reconcile::labels::contains_label(&lower, l))
    }

    /// Apply same-line and previous-line label/conflict adjustments.
    pub fn score_context(&self, doc: &Document, c: &mut Candidate, label_bonus: f32) {
        let line = doc.line(c.line_index).unwrap_or_default();
        if let Some(label) = self.label_in(line) {
            c.label(label, label_bonus);
        } else if let Some(prev) = c.line_index.checked_sub(1).and_then(|i| doc.line(i)) {
            if let Some(label) = self.label_in(prev) {
                c.label(label, label_bonus * 0.7);
                c.reason("label_previous_line");
            }
        }

        if let Some(conflict) = self.conflict_in(line) {
            c.keyword(conflict);
            c.adjust("conflicting_label", -1.5);
        } else if let Some(prev) = c.line_index.checked_sub(1).and_then(|i| doc.line(i)) {
            if self.conflict_in(prev).is_some() && self.label_in(line).is_none() {
                c.adjust("conflicting_label_nearby", -0.5);
            }
        }
    }
}

/// Why lines or tokens were dropped before becoming candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rejections(std::collections::BTreeMap<String, usize>);

impl Rejections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, reason: &str) {
        *self.0.entry(reason.to_string()).or_default() += 1;
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn counts(&self) -> &std::collections::BTreeMap<String, usize> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: Vocabulary = Vocabulary {
        labels: &["invoice"],
        conflicts: &["phone"],
    };

    #[test]
    fn adjustments_sum_into_score() {
        let doc = Document::from_lines(&["x"]);
        let mut c = Candidate::new(&doc, "A", "test", 0, "x");
        c.adjust("base", 1.0).adjust("penalty", -0.25);
        assert!((c.score - 0.75).abs() < 1e-6);
        assert_eq!(c.adjustments[1].delta, -0.25);
        assert_eq!(c.adjustments.len(), 2);
    }

    #[test]
    fn label_on_previous_line_counts_less() {
        let doc = Document::from_lines(&["INVOICE", "A-123"]);
        let mut c = Candidate::new(&doc, "A-123", "test", 1, "A-123");
        VOCAB.score_context(&doc, &mut c, 1.0);
        assert!(c.labeled);
        assert!((c.score - 0.7).abs() < 1e-6);
        assert!(c.reasons.contains(&"label_previous_line".to_string()));
    }

    #[test]
    fn conflict_on_same_line_is_penalized() {
        let doc = Document::from_lines(&["Phone 555 1234"]);
        let mut c = Candidate::new(&doc, "5551234", "test", 0, "Phone 555 1234");
        VOCAB.score_context(&doc, &mut c, 1.0);
        assert!(!c.labeled);
        assert!(c.score < 0.0);
    }

    #[test]
    fn rejections_count_by_reason() {
        let mut r = Rejections::new();
        r.record("phone");
        r.record("phone");
        r.record("url");
        assert_eq!(r.total(), 3);
        assert_eq!(r.counts()["phone"], 2);
    }
}
