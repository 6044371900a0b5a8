use serde::{Deserialize, Serialize};
use std::fmt;

pub const HIGH_CONFIDENCE: f32 = 0.75;
pub const MEDIUM_CONFIDENCE: f32 = 0.5;

/// Coarse classification used for threshold decisions downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceBucket {
    None,
    Low,
    Medium,
    High,
}

impl ConfidenceBucket {
    pub fn from_confidence(confidence: f32) -> Self {
        let c = clamp_confidence(confidence);
        if c >= HIGH_CONFIDENCE {
            ConfidenceBucket::High
        } else if c >= MEDIUM_CONFIDENCE {
            ConfidenceBucket::Medium
        } else if c > 0.0 {
            ConfidenceBucket::Low
        } else {
            ConfidenceBucket::None
        }
    }
}

impl fmt::Display for ConfidenceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBucket::None => write!(f, "NONE"),
            ConfidenceBucket::Low => write!(f, "LOW"),
            ConfidenceBucket::Medium => write!(f, "MEDIUM"),
            ConfidenceBucket::High => write!(f, "HIGH"),
        }
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(c: f32) -> f32 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}
