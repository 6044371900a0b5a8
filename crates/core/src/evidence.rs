use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered evidence map: plain JSON values only, so it persists losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence(BTreeMap<String, Value>);

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert any serializable value. Values that fail to serialize become `null`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let v = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.into(), v);
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Present and not `null`.
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_read_back() {
        let ev = Evidence::new()
            .with("total_candidates", 3usize)
            .with("winner_margin", 0.25f64)
            .with("labels", vec!["total"]);
        assert_eq!(ev.get_f64("total_candidates"), Some(3.0));
        assert_eq!(ev.get_f64("winner_margin"), Some(0.25));
        assert!(ev.has("labels"));
        assert!(!ev.has("missing"));
    }

    #[test]
    fn null_counts_as_absent() {
        let ev = Evidence::new().with("tax_rate_percent", Option::<f64>::None);
        assert!(!ev.has("tax_rate_percent"));
        assert_eq!(ev.len(), 1);
    }

    #[test]
    fn serializes_as_plain_object() {
        let ev = Evidence::new().with("a", 1);
        assert_eq!(serde_json::to_value(&ev).unwrap(), serde_json::json!({"a": 1}));
    }
}
