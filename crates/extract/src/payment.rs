use serde::{Deserialize, Serialize};

use provena_core::Evidence;

use crate::candidate::{Candidate, Vocabulary};
use crate::document::Document;
use crate::entity::{Entity, EntityResult};
use crate::patterns::{re_card_last4, re_payment};
use crate::resolve::resolve;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Cash,
    Debit,
    Check,
    ApplePay,
    GooglePay,
    GiftCard,
    Other(String),
}

impl PaymentMethod {
    /// Map a matched keyword onto a method.
    pub fn from_keyword(keyword: &str) -> Self {
        let squashed: String = keyword
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match squashed.as_str() {
            "visa" => PaymentMethod::Visa,
            "mastercard" | "mc" => PaymentMethod::Mastercard,
            "amex" | "americanexpress" => PaymentMethod::Amex,
            "discover" => PaymentMethod::Discover,
            "cash" => PaymentMethod::Cash,
            "debit" => PaymentMethod::Debit,
            "check" | "cheque" => PaymentMethod::Check,
            "applepay" => PaymentMethod::ApplePay,
            "googlepay" => PaymentMethod::GooglePay,
            "giftcard" => PaymentMethod::GiftCard,
            other => PaymentMethod::Other(other.to_string()),
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Visa | PaymentMethod::Mastercard | PaymentMethod::Amex | PaymentMethod::Discover
        )
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Visa => write!(f, "Visa"),
            PaymentMethod::Mastercard => write!(f, "Mastercard"),
            PaymentMethod::Amex => write!(f, "Amex"),
            PaymentMethod::Discover => write!(f, "Discover"),
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Debit => write!(f, "Debit"),
            PaymentMethod::Check => write!(f, "Check"),
            PaymentMethod::ApplePay => write!(f, "Apple Pay"),
            PaymentMethod::GooglePay => write!(f, "Google Pay"),
            PaymentMethod::GiftCard => write!(f, "Gift Card"),
            PaymentMethod::Other(s) => write!(f, "{s}"),
        }
    }
}

const VOCAB: Vocabulary = Vocabulary {
    labels: &[
        "paid by",
        "paid with",
        "payment",
        "payment method",
        "tender",
        "tendered",
        "card type",
        "method",
    ],
    conflicts: &["we accept", "accepted here", "accepted", "not accepted"],
};

/// How the document was paid.
pub fn extract(doc: &Document) -> EntityResult {
    let mut candidates = Vec::new();
    let mut last4: Option<String> = None;

    for (i, line) in doc.iter() {
        let card_digits = re_card_last4()
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        for m in re_payment().find_iter(line) {
            let method = PaymentMethod::from_keyword(m.as_str());
            let mut c = Candidate::new(doc, method.to_string(), "keyword", i, line);
            c.adjust("base", 1.0);
            c.keyword(&m.as_str().to_lowercase());
            if method.is_card() {
                if let Some(d) = &card_digits {
                    c.adjust("card_digits", 0.3).reason("card_digits");
                    last4.get_or_insert_with(|| d.clone());
                }
            }
            c.zone_adjust(-0.2, 0.1, 0.2);
            VOCAB.score_context(doc, &mut c, 1.0);
            candidates.push(c);
        }
    }

    let mut result = resolve(Entity::PaymentMethod, candidates, Evidence::new());
    // Last-four only describes the winner when the winner is a card.
    let winner_is_card = result
        .value
        .as_ref()
        .and_then(|v| v.as_text())
        .is_some_and(|v| PaymentMethod::from_keyword(v).is_card());
    result
        .evidence
        .insert("card_last4", if winner_is_card { last4 } else { None });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::UNLABELED_KEYWORD_CAP;

    fn payment(text: &str) -> EntityResult {
        extract(&Document::from_text(text))
    }

    fn method(text: &str) -> Option<String> {
        payment(text).value.and_then(|v| v.as_text().map(str::to_string))
    }

    #[test]
    fn visa() {
        assert_eq!(method("STARBUCKS\nPaid with VISA\nTotal $5.50").as_deref(), Some("Visa"));
    }

    #[test]
    fn amex_with_last_four() {
        let r = payment("WHOLE FOODS\nAmerican Express ending 1234\nTotal $87.50");
        assert_eq!(r.value.as_ref().unwrap().as_text(), Some("Amex"));
        assert_eq!(r.evidence.get("card_last4").unwrap(), "1234");
    }

    #[test]
    fn labeled_cash() {
        let r = payment("COFFEE SHOP\nPayment: Cash\nTotal $4.75");
        assert_eq!(r.value.as_ref().unwrap().as_text(), Some("Cash"));
        assert!(r.confidence > UNLABELED_KEYWORD_CAP);
    }

    #[test]
    fn bare_keyword_is_capped() {
        let r = payment("SHOP\nTotal 4.75\nDEBIT");
        assert_eq!(r.value.as_ref().unwrap().as_text(), Some("Debit"));
        assert!(r.confidence <= UNLABELED_KEYWORD_CAP);
    }

    #[test]
    fn accepted_cards_banner_is_not_payment() {
        let r = payment("SHOP\nWe accept Visa Mastercard\nPaid by: Cash");
        assert_eq!(r.value.unwrap().as_text(), Some("Cash"));
    }

    #[test]
    fn keyword_mapping() {
        assert_eq!(PaymentMethod::from_keyword("Master Card"), PaymentMethod::Mastercard);
        assert_eq!(PaymentMethod::from_keyword("cheque"), PaymentMethod::Check);
        assert_eq!(PaymentMethod::Other("Zelle".into()).to_string(), "Zelle");
    }
}
