use provena_core::Evidence;

use crate::candidate::{Candidate, Rejections, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::{re_date_iso, re_date_slash, re_invoice_standalone, re_invoice_token, re_phone};
use crate::resolve::resolve;

/// Ordered so longer phrasings win over their prefixes.
const VOCAB: Vocabulary = Vocabulary {
    labels: &[
        "invoice number",
        "invoice no",
        "invoice #",
        "invoice",
        "receipt number",
        "receipt no",
        "receipt #",
        "receipt",
        "order number",
        "order no",
        "order #",
        "order",
        "transaction id",
        "transaction #",
        "trans #",
        "ref no",
        "reference",
        "bill no",
        "doc no",
    ],
    conflicts: &[
        "phone",
        "tel",
        "fax",
        "account",
        "acct",
        "card",
        "auth",
        "approval",
        "terminal",
        "store #",
        "tax id",
        "vat no",
        "customer id",
        "member",
    ],
};

/// Document identifier, from an explicit label or a self-describing token.
pub fn extract(doc: &Document) -> EntityResult {
    let mut rejections = Rejections::new();
    let mut candidates = Vec::new();

    for (i, line) in doc.iter() {
        let lower = line.to_lowercase();
        if let Some(label) = VOCAB.label_in(line) {
            let Some(pos) = lower.find(label) else { continue };
            // Offsets can drift on non-ASCII text; `get` then yields nothing.
            let tail = line.get(pos + label.len()..).unwrap_or_default();
            match labeled_token(tail) {
                Some(token) => {
                    let mut c = Candidate::new(doc, token.to_uppercase(), "labeled_token", i, line);
                    c.adjust("base", 0.8);
                    c.label(label, 1.5);
                    score_token(&mut c, &token);
                    if let Some(conflict) = VOCAB.conflict_in(line) {
                        c.keyword(conflict);
                        c.adjust("conflicting_label", -1.5);
                    }
                    c.zone_adjust(0.2, 0.0, -0.2);
                    candidates.push(c);
                }
                None => rejections.record("label_without_token"),
            }
        }

        for m in re_invoice_standalone().find_iter(line) {
            let token = m.as_str();
            let mut c = Candidate::new(doc, token.to_uppercase(), "standalone_token", i, line);
            c.adjust("base", 0.9);
            score_token(&mut c, token);
            c.zone_adjust(0.2, 0.0, -0.2);
            candidates.push(c);
        }
    }

    let evidence = Evidence::new().with("rejections", rejections.counts());
    resolve(Entity::InvoiceId, candidates, evidence)
}

/// The identifier following a label, if it looks like one.
fn labeled_token(tail: &str) -> Option<String> {
    let caps = re_invoice_token().captures(tail)?;
    let token = caps.get(1)?.as_str().trim_end_matches(['-', '/']);
    if token.len() < 3 || !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if re_phone().is_match(token) || re_date_iso().is_match(token) || re_date_slash().is_match(token) {
        return None;
    }
    Some(token.to_string())
}

fn score_token(c: &mut Candidate, token: &str) {
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    if token.chars().any(|c| c.is_ascii_alphabetic()) && digits > 0 {
        c.adjust("alphanumeric", 0.2);
    }
    if digits >= 12 {
        // Card and account numbers run long.
        c.adjust("too_many_digits", -0.5);
    }
}
