use provena_core::{scan_amounts, Evidence};

use crate::candidate::{Candidate, Rejections, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::{re_date_iso, re_date_slash, re_digits_only, re_phone, re_url};
use crate::resolve::resolve;

const VOCAB: Vocabulary = Vocabulary {
    labels: &["merchant", "store", "vendor", "seller", "sold by", "company", "business name"],
    conflicts: &["bill to", "ship to", "sold to", "customer", "deliver to", "cashier", "server"],
};

/// Lines that announce the document rather than name who issued it.
const BOILERPLATE: &[&str] = &[
    "receipt",
    "invoice",
    "tax invoice",
    "sales receipt",
    "customer copy",
    "merchant copy",
    "thank you",
    "welcome",
    "welcome to",
    "original",
    "duplicate",
];

const BUSINESS_SUFFIXES: &[&str] = &[
    "inc", "llc", "ltd", "co", "corp", "gmbh", "market", "store", "shop", "cafe", "coffee",
    "restaurant", "pharmacy", "foods", "mart", "supermarket", "bakery", "grill", "bar",
];

const SCAN_LINES: usize = 10;

/// Who issued the document: a labeled name, or a plausible name line near the top.
pub fn extract(doc: &Document) -> EntityResult {
    let mut rejections = Rejections::new();
    let mut candidates = Vec::new();

    for (i, line) in doc.iter() {
        if let Some(c) = labeled_candidate(doc, i, line) {
            candidates.push(c);
            continue;
        }
        if i >= SCAN_LINES {
            continue;
        }
        if let Some(reason) = reject_line(line) {
            rejections.record(reason);
            continue;
        }

        let mut c = Candidate::new(doc, line, "header_line", i, line);
        c.adjust("base", 0.6);
        let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.iter().all(|c| c.is_uppercase()) {
            c.adjust("all_caps", 0.4).reason("all_caps");
        }
        c.adjust("early_line", 0.5 * (1.0 - i as f32 / SCAN_LINES as f32));
        c.zone_adjust(0.3, -0.3, -0.6);
        if has_business_suffix(line) {
            c.adjust("business_suffix", 0.3).reason("business_suffix");
        }
        if line.len() > 35 {
            c.adjust("long_line", -0.3);
        }
        VOCAB.score_context(doc, &mut c, 1.0);
        candidates.push(c);
    }

    let evidence = Evidence::new().with("rejections", rejections.counts());
    resolve(Entity::Merchant, candidates, evidence)
}

/// `Store: ACME HARDWARE` style lines.
fn labeled_candidate(doc: &Document, i: usize, line: &str) -> Option<Candidate> {
    let (head, tail) = line.split_once(':')?;
    let label = VOCAB.label_in(head)?;
    let name = tail.trim();
    if name.len() < 2 || reject_line(name).is_some() {
        return None;
    }
    let mut c = Candidate::new(doc, name, "labeled_line", i, line);
    c.adjust("base", 0.8);
    c.label(label, 1.5);
    c.zone_adjust(0.2, 0.0, -0.2);
    Some(c)
}

fn reject_line(line: &str) -> Option<&'static str> {
    let lower = line.to_lowercase();
    if line.len() < 3 {
        return Some("too_short");
    }
    if line.len() > 50 {
        return Some("too_long");
    }
    if re_phone().is_match(line) {
        return Some("phone");
    }
    if re_url().is_match(line) {
        return Some("url");
    }
    if re_date_slash().is_match(line) || re_date_iso().is_match(line) {
        return Some("date");
    }
    if re_digits_only().is_match(line) || line.starts_with(|c: char| c.is_ascii_digit()) {
        return Some("numeric");
    }
    if scan_amounts(line).iter().any(|t| t.is_monetary()) {
        return Some("amount");
    }
    if BOILERPLATE.iter().any(|b| lower.trim_matches(|c: char| !c.is_alphanumeric()) == *b) {
        return Some("boilerplate");
    }
    if line.chars().filter(|c| c.is_alphabetic()).count() < 3 {
        return Some("few_letters");
    }
    None
}

fn has_business_suffix(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| BUSINESS_SUFFIXES.contains(&w))
}
