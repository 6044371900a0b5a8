use std::collections::BTreeMap;

use provena_core::Evidence;

use crate::candidate::{Candidate, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::{re_currency_code, re_currency_symbol};
use crate::resolve::resolve;

const VOCAB: Vocabulary = Vocabulary {
    labels: &["currency", "all amounts in", "amounts in", "prices in"],
    conflicts: &["exchange rate", "converted from", "fx rate"],
};

/// Each further sighting of the same currency adds this, up to `REPEAT_CAP`.
const REPEAT_BONUS: f32 = 0.1;
const REPEAT_CAP: f32 = 0.5;

fn symbol_code(symbol: &str) -> Option<&'static str> {
    let code = match symbol {
        "$" | "US$" => "USD",
        "C$" | "CA$" => "CAD",
        "A$" | "AU$" => "AUD",
        "NZ$" => "NZD",
        "€" => "EUR",
        "£" => "GBP",
        "¥" => "JPY",
        "₹" => "INR",
        _ => return None,
    };
    Some(code)
}

/// ISO currency, from explicit codes or, less reliably, from symbols.
/// A bare `$` reads as USD.
pub fn extract(doc: &Document) -> EntityResult {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut sightings: BTreeMap<&'static str, usize> = BTreeMap::new();

    for (i, line) in doc.iter() {
        for m in re_currency_code().find_iter(line) {
            let Some(code) = intern(m.as_str()) else { continue };
            *sightings.entry(code).or_default() += 1;
            let mut c = Candidate::new(doc, code, "iso_code", i, line);
            c.adjust("base", 1.2);
            // An ISO code is its own label.
            c.label(code, 0.5);
            VOCAB.score_context(doc, &mut c, 0.8);
            candidates.push(c);
        }
        for m in re_currency_symbol().find_iter(line) {
            let Some(code) = symbol_code(m.as_str()) else { continue };
            *sightings.entry(code).or_default() += 1;
            let mut c = Candidate::new(doc, code, "symbol", i, line);
            c.adjust("base", 0.8);
            c.keyword(m.as_str());
            VOCAB.score_context(doc, &mut c, 0.8);
            candidates.push(c);
        }
    }

    for c in &mut candidates {
        let seen = c
            .value
            .as_text()
            .and_then(|code| sightings.get(code).copied())
            .unwrap_or(1);
        if seen > 1 {
            let bonus = (REPEAT_BONUS * (seen - 1) as f32).min(REPEAT_CAP);
            c.adjust("repeated", bonus);
        }
    }

    let evidence = Evidence::new().with("sightings", &sightings);
    resolve(Entity::Currency, candidates, evidence)
}

fn intern(code: &str) -> Option<&'static str> {
    const CODES: &[&str] = &[
        "USD", "EUR", "GBP", "CAD", "AUD", "NZD", "JPY", "CHF", "INR", "MXN", "SGD", "HKD", "CNY",
        "SEK", "NOK", "DKK", "ZAR", "BRL",
    ];
    CODES.iter().copied().find(|c| *c == code)
}
