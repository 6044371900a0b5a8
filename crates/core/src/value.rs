use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The typed value an entity candidate carries.
///
/// Serialized adjacently tagged (`{"kind": "decimal", "value": "12.50"}`) so a
/// decimal never comes back as a string after a round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
}

impl EntityValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            EntityValue::Decimal(d) => Some(*d),
            EntityValue::Integer(i) => Some(Decimal::from(*i)),
            EntityValue::Text(_) => None,
        }
    }

    /// Zero amounts and blank strings are values in name only.
    pub fn is_zero_or_empty(&self) -> bool {
        match self {
            EntityValue::Text(s) => s.trim().is_empty(),
            EntityValue::Integer(i) => *i == 0,
            EntityValue::Decimal(d) => d.is_zero(),
        }
    }

    /// Key used to detect that two candidates propose the same value.
    pub fn normalized_key(&self) -> String {
        match self {
            EntityValue::Text(s) => s
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            EntityValue::Integer(i) => i.to_string(),
            EntityValue::Decimal(d) => d.normalize().to_string(),
        }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Text(s) => write!(f, "{s}"),
            EntityValue::Integer(i) => write!(f, "{i}"),
            EntityValue::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        EntityValue::Text(s)
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::Text(s.to_string())
    }
}

impl From<i64> for EntityValue {
    fn from(i: i64) -> Self {
        EntityValue::Integer(i)
    }
}

impl From<Decimal> for EntityValue {
    fn from(d: Decimal) -> Self {
        EntityValue::Decimal(d)
    }
}

impl From<crate::Money> for EntityValue {
    fn from(m: crate::Money) -> Self {
        EntityValue::Decimal(m.amount())
    }
}
