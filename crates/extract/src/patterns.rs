use std::sync::OnceLock;

use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_phone, r"\(?\d{3}\)?[\s\-.]\d{3}[\s\-.]\d{4}");
re!(re_url, r"(?i)(https?://|www\.)\S+|\S+@\S+\.\w+");
re!(re_digits_only, r"^[\d\s\-./:#*]+$");

re!(re_date_month_name,
    r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b");
re!(re_date_abbr_day_first,
    r"(?i)\b(\d{1,2})[\s\-](jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)\.?[\s\-,]+(\d{2,4})\b");
re!(re_date_abbr_month_first,
    r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)\.?\s+(\d{1,2}),?\s+(\d{4})\b");
re!(re_date_iso, r"\b(\d{4})-(\d{2})-(\d{2})\b");
re!(re_date_slash, r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b");
re!(re_date_dash, r"\b(\d{1,2})-(\d{1,2})-(\d{2,4})\b");
re!(re_date_dot, r"\b(\d{1,2})\.(\d{1,2})\.(\d{2,4})\b");

re!(re_currency_code,
    r"\b(USD|EUR|GBP|CAD|AUD|NZD|JPY|CHF|INR|MXN|SGD|HKD|CNY|SEK|NOK|DKK|ZAR|BRL)\b");
re!(re_currency_symbol, r"(C\$|CA\$|A\$|AU\$|NZ\$|US\$|[$€£¥₹])");

re!(re_payment,
    r"(?i)\b(visa|mastercard|master\s*card|amex|american\s+express|discover|cash|debit|check|cheque|apple\s+pay|google\s+pay|gift\s+card)\b");
re!(re_card_last4, r"(?i)(?:ending(?:\s+in)?|x{2,}|\*{2,}|#)\s*(\d{4})\b");

re!(re_invoice_token, r"(?i)^[#:.\s]*(?:no\.?|number|num|#|id)?[#:.\s]*([A-Z0-9][A-Z0-9\-/]{2,24})\b");
re!(re_invoice_standalone, r"(?i)\b((?:INV|RCPT|ORD|REC)[\-#]?\d{3,})\b");

re!(re_percent, r"(\d+(?:\.\d+)?)\s*%");
re!(re_quantity, r"^\s*(\d{1,3})\s*(?:[xX@*]\s*|\s+)(.+)$");
