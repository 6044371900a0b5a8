use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};

use provena_core::Evidence;

use crate::candidate::{Candidate, Rejections, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::*;
use crate::resolve::resolve;

const VOCAB: Vocabulary = Vocabulary {
    labels: &[
        "date",
        "transaction date",
        "invoice date",
        "issued",
        "issue date",
        "purchase date",
        "sale date",
        "dated",
    ],
    conflicts: &[
        "due",
        "due date",
        "expiry",
        "exp",
        "expires",
        "valid until",
        "valid thru",
        "member since",
        "return by",
        "ship date",
        "delivery date",
    ],
};

const MIN_YEAR: i32 = 1990;
const MAX_YEAR: i32 = 2100;

/// A date format, how much its shape alone is worth, and how to read it.
struct DateFormat {
    name: &'static str,
    pattern: fn() -> &'static Regex,
    base: f32,
    parse: fn(&Captures) -> Option<(NaiveDate, bool)>,
}

/// Ordered most to least specific.
const FORMATS: [DateFormat; 7] = [
    DateFormat { name: "iso", pattern: re_date_iso, base: 1.0, parse: parse_iso },
    DateFormat { name: "month_name", pattern: re_date_month_name, base: 1.0, parse: parse_month_name },
    DateFormat { name: "abbr_month_first", pattern: re_date_abbr_month_first, base: 0.9, parse: parse_abbr_month_first },
    DateFormat { name: "abbr_day_first", pattern: re_date_abbr_day_first, base: 0.9, parse: parse_abbr_day_first },
    DateFormat { name: "slash", pattern: re_date_slash, base: 0.8, parse: parse_numeric },
    DateFormat { name: "dot", pattern: re_date_dot, base: 0.8, parse: parse_day_first },
    DateFormat { name: "dash", pattern: re_date_dash, base: 0.7, parse: parse_numeric },
];

/// Transaction date, normalized to ISO `YYYY-MM-DD`.
pub fn extract(doc: &Document) -> EntityResult {
    let mut rejections = Rejections::new();
    let mut candidates = Vec::new();

    for (i, line) in doc.iter() {
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        for format in &FORMATS {
            for caps in (format.pattern)().captures_iter(line) {
                let Some(m) = caps.get(0) else { continue };
                // A more specific format already read this span.
                if claimed.iter().any(|&(s, e)| m.start() < e && s < m.end()) {
                    continue;
                }
                let Some((date, ambiguous)) = (format.parse)(&caps) else {
                    rejections.record("invalid_date");
                    continue;
                };
                if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                    rejections.record("implausible_year");
                    continue;
                }
                claimed.push((m.start(), m.end()));

                let iso = date.format("%Y-%m-%d").to_string();
                let mut c = Candidate::new(doc, iso, format.name, i, line);
                c.adjust("base", format.base);
                c.reason(format.name);
                if ambiguous {
                    c.adjust("ambiguous_day_month", -0.1).reason("ambiguous_day_month");
                }
                c.zone_adjust(0.2, 0.0, -0.1);
                VOCAB.score_context(doc, &mut c, 1.0);
                candidates.push(c);
            }
        }
    }

    let evidence = Evidence::new().with("rejections", rejections.counts());
    let mut result = resolve(Entity::Date, candidates, evidence);
    let format = result.winner().map(|c| c.source.clone());
    result.evidence.insert("format", format);
    result
}

// ── Parsers ──────────────────────────────────────────────────────────────────

fn num<T: std::str::FromStr>(caps: &Captures, i: usize) -> Option<T> {
    caps.get(i)?.as_str().parse().ok()
}

fn parse_iso(c: &Captures) -> Option<(NaiveDate, bool)> {
    NaiveDate::from_ymd_opt(num(c, 1)?, num(c, 2)?, num(c, 3)?).map(|d| (d, false))
}

fn parse_month_name(c: &Captures) -> Option<(NaiveDate, bool)> {
    let month = month_to_num(c.get(1)?.as_str())?;
    NaiveDate::from_ymd_opt(num(c, 3)?, month, num(c, 2)?).map(|d| (d, false))
}

fn parse_abbr_month_first(c: &Captures) -> Option<(NaiveDate, bool)> {
    let month = month_to_num(c.get(1)?.as_str())?;
    NaiveDate::from_ymd_opt(num(c, 3)?, month, num(c, 2)?).map(|d| (d, false))
}

fn parse_abbr_day_first(c: &Captures) -> Option<(NaiveDate, bool)> {
    let month = month_to_num(c.get(2)?.as_str())?;
    let year = expand_year(num(c, 3)?);
    NaiveDate::from_ymd_opt(year, month, num(c, 1)?).map(|d| (d, false))
}

/// US month-first unless the first field cannot be a month.
fn parse_numeric(c: &Captures) -> Option<(NaiveDate, bool)> {
    let p1: u32 = num(c, 1)?;
    let p2: u32 = num(c, 2)?;
    let year = expand_year(num(c, 3)?);
    let ambiguous = p1 <= 12 && p2 <= 12 && p1 != p2;
    if p1 > 12 {
        return NaiveDate::from_ymd_opt(year, p2, p1).map(|d| (d, false));
    }
    NaiveDate::from_ymd_opt(year, p1, p2).map(|d| (d, ambiguous))
}

/// Dotted dates are day-first.
fn parse_day_first(c: &Captures) -> Option<(NaiveDate, bool)> {
    let day: u32 = num(c, 1)?;
    let month: u32 = num(c, 2)?;
    let year = expand_year(num(c, 3)?);
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, false))
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn month_to_num(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
