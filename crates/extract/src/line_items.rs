use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use provena_core::{is_percentage_only, scan_amounts, Money};
use provena_reconcile::labels::{scan_labeled, LabelSet, DISCOUNT, SUBTOTAL, TAX, TIP, TOTAL};

use crate::candidate::{Rejections, Vocabulary};
use crate::document::{Document, Zone};
use crate::patterns::{re_quantity, re_payment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: Money,
    pub quantity: Option<Decimal>,
    pub line_index: usize,
}

/// All item lines of a document, with one confidence for the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItems {
    pub items: Vec<LineItem>,
    pub confidence: f32,
    /// Items sum matched a printed subtotal.
    pub matches_subtotal: bool,
    #[serde(default)]
    pub rejected: usize,
}

impl LineItems {
    pub fn amounts(&self) -> Vec<Money> {
        self.items.iter().map(|i| i.amount).collect()
    }

    pub fn sum(&self) -> Option<Money> {
        items_sum(&self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

const SUMMARY_SETS: [LabelSet; 5] = [TOTAL, SUBTOTAL, TAX, DISCOUNT, TIP];

/// Lines that carry an amount but are never something bought.
const NON_ITEM: Vocabulary = Vocabulary {
    labels: &[],
    conflicts: &[
        "change",
        "tendered",
        "balance",
        "amount due",
        "paid",
        "payment",
        "total",
        "points",
        "rounding",
        "deposit",
    ],
};

const BASE_CONFIDENCE: f32 = 0.5;
const PER_ITEM_BONUS: f32 = 0.05;
const MAX_UNVERIFIED_CONFIDENCE: f32 = 0.8;
const SUBTOTAL_MATCH_CONFIDENCE: f32 = 0.9;
const SUBTOTAL_MATCH_TOLERANCE: f64 = 0.01;

/// Description followed by a trailing amount, outside the header and summary lines.
pub fn extract(doc: &Document) -> LineItems {
    let mut rejections = Rejections::new();
    let mut items = Vec::new();

    for (i, line) in doc.iter() {
        if doc.zone(i) == Zone::Header && doc.len() > 3 {
            continue;
        }
        if is_summary_line(line) {
            rejections.record("summary_line");
            continue;
        }
        if re_payment().is_match(line) {
            rejections.record("payment_line");
            continue;
        }
        if is_percentage_only(line) {
            rejections.record("percentage_only");
            continue;
        }

        let tokens = scan_amounts(line);
        let Some(last) = tokens.iter().filter(|t| t.is_monetary()).last() else {
            continue;
        };
        let description = line[..last.start].trim().trim_end_matches(['.', ':', '-', '@']).trim();
        if description.chars().filter(|c| c.is_alphabetic()).count() < 2 {
            rejections.record("no_description");
            continue;
        }
        if last.value.is_zero() {
            rejections.record("zero_amount");
            continue;
        }

        let (quantity, description) = split_quantity(description);
        items.push(LineItem {
            description: description.to_string(),
            amount: last.value,
            quantity,
            line_index: i,
        });
    }

    let subtotal = scan_labeled(doc.lines(), &SUBTOTAL)
        .amounts
        .last()
        .map(|h| h.amount);
    let sum = items_sum(&items);
    let matches_subtotal = match (sum, subtotal) {
        (Some(s), Some(st)) => s
            .relative_diff(st)
            .is_some_and(|r| r <= SUBTOTAL_MATCH_TOLERANCE),
        _ => false,
    };

    let confidence = if items.is_empty() {
        0.0
    } else if matches_subtotal {
        SUBTOTAL_MATCH_CONFIDENCE
    } else {
        (BASE_CONFIDENCE + PER_ITEM_BONUS * items.len() as f32).min(MAX_UNVERIFIED_CONFIDENCE)
    };

    LineItems {
        items,
        confidence,
        matches_subtotal,
        rejected: rejections.total(),
    }
}

/// `None` when there are no items or the sum overflows.
fn items_sum(items: &[LineItem]) -> Option<Money> {
    if items.is_empty() {
        return None;
    }
    Money::checked_sum(items.iter().map(|i| i.amount))
}

fn is_summary_line(line: &str) -> bool {
    SUMMARY_SETS.iter().any(|set| set.match_line(line).is_some()) || NON_ITEM.conflict_in(line).is_some()
}

/// `2 x Coffee` / `3 @ Bagel` → quantity plus the rest.
fn split_quantity(description: &str) -> (Option<Decimal>, &str) {
    let Some(caps) = re_quantity().captures(description) else {
        return (None, description);
    };
    let (Some(qty), Some(rest)) = (caps.get(1), caps.get(2)) else {
        return (None, description);
    };
    let rest = rest.as_str().trim();
    if rest.chars().filter(|c| c.is_alphabetic()).count() < 2 {
        return (None, description);
    }
    (qty.as_str().parse().ok(), rest)
}
