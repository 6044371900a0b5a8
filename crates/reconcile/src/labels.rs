use provena_core::{is_percentage_only, scan_amounts, Money};

/// Vocabulary for one amount field: labels that name it and phrases that,
/// when present on the same line, mean the line is about something else.
#[derive(Debug, Clone, Copy)]
pub struct LabelSet {
    pub name: &'static str,
    pub labels: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

pub const TOTAL: LabelSet = LabelSet {
    name: "total",
    labels: &[
        "grand total",
        "total due",
        "amount due",
        "balance due",
        "total amount",
        "amount payable",
        "total to pay",
        "total",
    ],
    excludes: &[
        "subtotal",
        "sub total",
        "sub-total",
        "total tax",
        "tax total",
        "total savings",
        "total discount",
        "total items",
        "items total",
        "total qty",
        "total quantity",
    ],
};

pub const SUBTOTAL: LabelSet = LabelSet {
    name: "subtotal",
    labels: &[
        "subtotal",
        "sub total",
        "sub-total",
        "net amount",
        "amount before tax",
        "merchandise total",
    ],
    excludes: &[],
};

pub const TAX: LabelSet = LabelSet {
    name: "tax",
    labels: &["sales tax", "total tax", "tax", "vat", "gst", "hst", "pst", "qst"],
    excludes: &[
        "tax id",
        "tax no",
        "tax number",
        "tax invoice",
        "vat no",
        "vat reg",
        "vat number",
        "gst no",
        "gst reg",
        "hst no",
        "before tax",
        "pre-tax",
        "excl",
        "incl",
    ],
};

pub const DISCOUNT: LabelSet = LabelSet {
    name: "discount",
    labels: &["discount", "coupon", "you saved", "savings", "promo", "markdown"],
    excludes: &[],
};

pub const TIP: LabelSet = LabelSet {
    name: "tip",
    labels: &["tip", "gratuity"],
    excludes: &["tip guide", "suggested tip", "suggested gratuity"],
};

const ALL_SETS: [LabelSet; 5] = [TOTAL, SUBTOTAL, TAX, DISCOUNT, TIP];

/// Whether `label` occurs in `haystack` (already lowercased) on word boundaries.
pub fn contains_label(haystack: &str, label: &str) -> bool {
    find_label(haystack, label).is_some()
}

fn find_label(haystack: &str, label: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(label) {
        let start = from + pos;
        let end = start + label.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = start + label.len().max(1);
        if from >= haystack.len() {
            break;
        }
    }
    None
}

impl LabelSet {
    /// The first label matched on this line, ignoring excluded phrasings.
    pub fn match_line(&self, line: &str) -> Option<(&'static str, usize)> {
        let lower = line.to_lowercase();
        if self.excludes.iter().any(|e| contains_label(&lower, e)) {
            return None;
        }
        self.labels
            .iter()
            .find_map(|l| find_label(&lower, l).map(|pos| (*l, pos)))
    }
}

fn has_any_label(line: &str) -> bool {
    let lower = line.to_lowercase();
    ALL_SETS
        .iter()
        .any(|set| set.labels.iter().any(|l| contains_label(&lower, l)))
}

/// An amount found next to a field label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledAmount {
    pub line_index: usize,
    pub label: &'static str,
    pub amount: Money,
    pub formatted: bool,
    /// The amount sat on the line after the label rather than beside it.
    pub next_line: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScan {
    pub amounts: Vec<LabeledAmount>,
    /// Lines where the label appeared with no usable amount.
    pub bare_labels: usize,
    pub percentage_lines: usize,
}

impl LabelScan {
    pub fn label_seen(&self) -> bool {
        !self.amounts.is_empty() || self.bare_labels > 0 || self.percentage_lines > 0
    }
}

/// Scan every line for `set`'s labels and collect the amount each one names:
/// the rightmost monetary token after the label, or on the following line when
/// the label stands alone. Percentage-only lines never yield an amount.
pub fn scan_labeled<S: AsRef<str>>(lines: &[S], set: &LabelSet) -> LabelScan {
    let mut scan = LabelScan::default();

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let Some((label, label_pos)) = set.match_line(line) else {
            continue;
        };

        if is_percentage_only(line) {
            scan.percentage_lines += 1;
            continue;
        }

        let same_line = scan_amounts(line)
            .into_iter()
            .filter(|t| t.is_monetary() && t.start + t.raw.len() > label_pos)
            .next_back();

        let (token, next_line) = match same_line {
            Some(t) => (Some(t), false),
            None => {
                let following = lines
                    .get(i + 1)
                    .map(AsRef::as_ref)
                    .filter(|next| !has_any_label(next) && !is_percentage_only(next));
                let token = following.and_then(|next| {
                    scan_amounts(next).into_iter().filter(|t| t.is_monetary()).next_back()
                });
                (token, true)
            }
        };

        match token {
            Some(t) => scan.amounts.push(LabeledAmount {
                line_index: i,
                label,
                amount: t.value,
                formatted: t.formatted,
                next_line,
            }),
            None => scan.bare_labels += 1,
        }
    }

    scan
}
