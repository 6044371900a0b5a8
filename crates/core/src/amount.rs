use std::sync::OnceLock;

use regex::Regex;

use crate::money::Money;

fn re_amount_token() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<code>\b(?:usd|eur|gbp|cad|aud|chf|jpy|inr|mxn|nzd|sgd)\s?)?(?P<sym>[$€£¥₹])?\s?(?P<open>\()?(?P<neg>-)?(?P<num>\d[\d,.]*\d|\d)(?P<close>\))?(?P<trail>-(?:\s|$))?(?P<pct>\s?%)?",
        )
        .expect("invalid regex")
    })
}

/// One numeric token found on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountToken {
    pub value: Money,
    pub raw: String,
    /// Byte offset of the token within the line.
    pub start: usize,
    /// Carries a currency symbol/code or thousands grouping.
    pub formatted: bool,
    /// Has a two-digit fractional part.
    pub has_cents: bool,
    pub is_percent: bool,
}

impl AmountToken {
    /// Whether this token can stand for a monetary amount at all.
    pub fn is_monetary(&self) -> bool {
        !self.is_percent && (self.has_cents || self.formatted)
    }
}

/// Scan a line for numeric tokens. Percentages are returned flagged so callers
/// can reject percentage-only lines; tokens glued to letters (`INV1234`) are skipped.
pub fn scan_amounts(line: &str) -> Vec<AmountToken> {
    let mut out = Vec::new();
    for c in re_amount_token().captures_iter(line) {
        let Some(whole) = c.get(0) else { continue };
        let Some(num) = c.name("num") else { continue };

        let glued = c.name("code").is_none()
            && line[..num.start()]
                .chars()
                .next_back()
                .is_some_and(|ch| ch.is_alphabetic() || ch == '#' || ch == '/');
        let glued_after = line[num.end()..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_alphabetic() || ch == '/');
        if glued || glued_after {
            continue;
        }

        let digits = num.as_str();
        let is_percent = c.name("pct").is_some();
        let has_symbol = c.name("sym").is_some() || c.name("code").is_some();
        let grouped = has_thousands_grouping(digits);
        let has_cents = has_two_decimals(digits);
        let negative = c.name("neg").is_some()
            || (c.name("open").is_some() && c.name("close").is_some())
            || c.name("trail").is_some();

        let value = if is_percent {
            Money::parse(digits)
        } else {
            Money::parse(if negative {
                whole.as_str()
            } else {
                digits
            })
        };
        let Some(mut value) = value else { continue };
        if negative && value.is_positive() {
            value = -value;
        }

        out.push(AmountToken {
            value,
            raw: whole.as_str().trim().to_string(),
            start: whole.start(),
            formatted: has_symbol || grouped,
            has_cents,
            is_percent,
        });
    }
    out
}

/// A line whose only numbers are percentages (`TAX @5%`) never yields an amount.
pub fn is_percentage_only(line: &str) -> bool {
    let tokens = scan_amounts(line);
    tokens.iter().any(|t| t.is_percent) && !tokens.iter().any(|t| t.is_monetary())
}

fn has_thousands_grouping(digits: &str) -> bool {
    let separators = digits.chars().filter(|c| *c == ',' || *c == '.').count();
    // A lone dot is a decimal mark, never grouping.
    if separators < 2 && !digits.contains(',') {
        return false;
    }
    let groups: Vec<&str> = digits.split([',', '.']).collect();
    if groups.len() < 2 {
        return false;
    }
    let inner_ok = groups[1..groups.len() - 1].iter().all(|g| g.len() == 3);
    let last = groups[groups.len() - 1];
    let first = groups[0];
    (1..=3).contains(&first.len())
        && inner_ok
        && (last.len() == 3 || (groups.len() > 2 && last.len() == 2))
}

fn has_two_decimals(digits: &str) -> bool {
    let Some(idx) = digits.rfind(['.', ',']) else {
        return false;
    };
    let tail = &digits[idx + 1..];
    tail.len() == 2 && tail.chars().all(|c| c.is_ascii_digit())
}
