//! Behavioral thresholds. These values are part of the output contract.

/// Minimum alignment confidence for a column-aligned total to be trusted.
pub const MIN_ALIGNMENT_CONFIDENCE: f32 = 0.60;
/// Semantic confidence required to override a disagreeing aligned total.
pub const SEMANTIC_OVERRIDE_THRESHOLD: f32 = 0.65;
/// Semantic confidence required to supply a total when nothing else did.
pub const SEMANTIC_SOFT_FALLBACK_THRESHOLD: f32 = 0.55;

/// Semantic and aligned totals agree within max(absolute, relative) tolerance.
pub const CONFIRMATION_TOLERANCE_CENTS: i64 = 1;
pub const CONFIRMATION_TOLERANCE_RATIO: f64 = 0.01;
pub const CONFIRMATION_BOOST: f32 = 0.10;
pub const MAX_CONFIRMED_CONFIDENCE: f32 = 0.99;

/// |subtotal + tax - total| / total must stay within this for a consistent combination.
pub const ARITHMETIC_TOLERANCE: f64 = 0.02;
/// Implied tax rate (tax / subtotal) above this is implausible.
pub const MAX_IMPLIED_TAX_RATE: f64 = 0.30;
pub const ARITHMETIC_CONSISTENCY_BOOST: f32 = 0.10;
pub const MAX_REGEX_CONFIDENCE: f32 = 0.95;

/// Regex-window totals found by the keyword scan.
pub const REGEX_FORMATTED_CONFIDENCE: f32 = 0.72;
pub const REGEX_BARE_CONFIDENCE: f32 = 0.60;
/// Labeled subtotal/discount/tip/tax amounts found by the keyword scan.
pub const LABELED_AMOUNT_CONFIDENCE: f32 = 0.70;
pub const LEGACY_CONFIDENCE: f32 = 0.50;

/// Line items below this confidence only count as a raw sum.
pub const ITEMS_INCLUSION_THRESHOLD: f32 = 0.35;

pub const MISMATCH_NONE_BELOW: f64 = 0.03;
pub const MISMATCH_WEAK_BELOW: f64 = 0.08;
pub const MISMATCH_STRONG_ABOVE: f64 = 0.15;
/// Support needed before a mismatch may touch any externally visible score.
pub const MISMATCH_SUPPORT_THRESHOLD: f32 = 0.65;
