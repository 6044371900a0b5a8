//! Amount reconciliation: combines total/subtotal/tax/discount/tip candidates
//! from regex scans, column-aligned layout, semantic hints and legacy values
//! into one provenance-tagged result with a gated mismatch signal.
//!
//! Pure engine crate: no IO, no persistent state.

pub mod arithmetic;
pub mod engine;
pub mod fields;
pub mod input;
pub mod labels;
pub mod mismatch;
pub mod result;
pub mod thresholds;
pub mod total;

pub use engine::reconcile;
pub use input::{AlignedHint, LegacyAmounts, ReconcileInput, ScoredAmount, SemanticHint};
pub use result::{
    GatedReason, MismatchSignal, MismatchStrength, Provenance, ReconciledAmount,
    ReconciliationResult,
};
