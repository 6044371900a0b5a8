//! Receipt text → per-entity results with ranked candidates, calibrated
//! confidence and a reconciled amount block.

pub mod amounts;
pub mod candidate;
pub mod currency;
pub mod date;
pub mod document;
pub mod entity;
pub mod invoice;
pub mod labeling;
pub mod line_items;
pub mod merchant;
mod patterns;
pub mod payment;
pub mod pipeline;
pub mod resolve;

pub use candidate::{Adjustment, Candidate};
pub use document::{Document, Zone};
pub use entity::{Entity, EntityResult, MapError};
pub use labeling::{CandidateSummary, LabelingRecord, DEFAULT_TOP_K};
pub use line_items::{LineItem, LineItems};
pub use payment::PaymentMethod;
pub use pipeline::{
    extract_entity, DocumentAnalysis, DocumentHints, DocumentPipeline, PipelineError,
};
