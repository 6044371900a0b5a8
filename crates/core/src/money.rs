use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// A monetary amount rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// OCR can produce amounts near `Decimal::MAX`; arithmetic on them returns
    /// `None` instead of overflowing.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sum of `amounts`; zero when empty, `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// `|self - other| / |other|`, or `None` when `other` is zero or the
    /// quotient does not fit.
    pub fn relative_diff(self, other: Money) -> Option<f64> {
        if other.is_zero() {
            return None;
        }
        let diff = self.checked_sub(other)?.0.abs();
        diff.checked_div(other.0.abs())?.to_f64()
    }

    /// Parse an OCR amount token such as `$1,234.56`, `1.234,56`, `(12.00)` or `12.00-`.
    ///
    /// Percentages are never amounts and yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() || s.contains('%') {
            return None;
        }

        let negative = (s.starts_with('(') && s.ends_with(')'))
            || s.starts_with('-')
            || s.ends_with('-');

        let digits: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        if !digits.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }

        let normalized = normalize_separators(&digits)?;
        let mut dec = Decimal::from_str(&normalized).ok()?;
        if negative {
            dec = -dec;
        }
        Some(Money::from_decimal(dec))
    }
}

/// Resolve thousands/decimal separators into a plain `1234.56` string.
fn normalize_separators(s: &str) -> Option<String> {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) => {
            if s.matches('.').count() > 1 {
                // 1.234.567 is grouping; 1.234.56 keeps the final dot as decimal.
                let tail = s.rsplit('.').next().unwrap_or("");
                if tail.len() == 3 { None } else { Some('.') }
            } else {
                Some('.')
            }
        }
        (None, Some(_)) => {
            let tail = s.rsplit(',').next().unwrap_or("");
            if s.matches(',').count() == 1 && (1..=2).contains(&tail.len()) {
                Some(',')
            } else {
                None
            }
        }
        (None, None) => None,
    };

    let out: String = match decimal_sep {
        Some(sep) => {
            let idx = s.rfind(sep)?;
            let (int_part, frac_part) = s.split_at(idx);
            let int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
            let frac_digits: String = frac_part.chars().filter(char::is_ascii_digit).collect();
            let int_digits = if int_digits.is_empty() { "0".to_string() } else { int_digits };
            if frac_digits.is_empty() {
                int_digits
            } else {
                format!("{int_digits}.{frac_digits}")
            }
        }
        None => s.chars().filter(char::is_ascii_digit).collect(),
    };

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}
