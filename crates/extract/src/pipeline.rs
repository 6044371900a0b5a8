use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use provena_calibration::hash::{sha256_bytes, to_hex};
use provena_calibration::{CalibrationSettings, Calibrator, ConfigError};
use provena_core::{Money, SCHEMA_VERSION};
use provena_reconcile::{
    reconcile, AlignedHint, LegacyAmounts, ReconcileInput, ReconciliationResult, ScoredAmount,
    SemanticHint,
};

use crate::document::Document;
use crate::entity::{Entity, EntityResult, MapError};
use crate::line_items::{self, LineItems};
use crate::{amounts, currency, date, invoice, merchant, payment};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Amount hints produced upstream of text extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentHints {
    pub aligned: Option<AlignedHint>,
    pub semantic: Option<SemanticHint>,
    pub ocr_confidence: Option<f32>,
    #[serde(default)]
    pub legacy: LegacyAmounts,
}

/// Everything learned about one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// SHA-256 of the input text.
    pub text_sha256: String,
    pub source: Option<PathBuf>,
    pub entities: BTreeMap<Entity, EntityResult>,
    pub line_items: LineItems,
    pub reconciliation: ReconciliationResult,
    pub schema_version: u32,
}

impl DocumentAnalysis {
    pub fn entity(&self, entity: Entity) -> Option<&EntityResult> {
        self.entities.get(&entity)
    }

    pub fn to_map(&self) -> Result<serde_json::Value, MapError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_map(value: serde_json::Value) -> Result<Self, MapError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Run one entity's extractor. Extractors see only the document.
pub fn extract_entity(entity: Entity, doc: &Document) -> EntityResult {
    match entity {
        Entity::Merchant => merchant::extract(doc),
        Entity::Date => date::extract(doc),
        Entity::Currency => currency::extract(doc),
        Entity::Total => amounts::extract_total(doc),
        Entity::Tax => amounts::extract_tax(doc),
        Entity::InvoiceId => invoice::extract(doc),
        Entity::PaymentMethod => payment::extract(doc),
    }
}

/// Orchestrates: normalize → extract each entity → calibrate → line items → reconcile.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    calibrator: Calibrator,
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new(Calibrator::disabled())
    }
}

impl DocumentPipeline {
    pub fn new(calibrator: Calibrator) -> Self {
        Self { calibrator }
    }

    /// Settings from a TOML file, then environment overrides.
    pub fn from_config_file(path: &Path) -> Result<Self, PipelineError> {
        let settings = CalibrationSettings::load(path)?.with_env_overrides()?;
        Ok(Self::new(Calibrator::new(settings)))
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    pub fn analyze_text(&self, text: &str, hints: &DocumentHints) -> DocumentAnalysis {
        let doc = Document::from_text(text);
        let entities: BTreeMap<Entity, EntityResult> = Entity::ALL
            .iter()
            .map(|&e| (e, extract_entity(e, &doc).calibrate(&self.calibrator)))
            .collect();
        let items = line_items::extract(&doc);

        let input = reconcile_input(&doc, &entities, &items, hints);
        let reconciliation = reconcile(&input);

        debug!(
            lines = doc.len(),
            items = items.items.len(),
            "document analyzed"
        );

        DocumentAnalysis {
            text_sha256: to_hex(&sha256_bytes(text.as_bytes())),
            source: None,
            entities,
            line_items: items,
            reconciliation,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Read a text file and analyze it. Invalid UTF-8 is replaced, not rejected.
    pub async fn process_file(
        &self,
        path: &Path,
        hints: &DocumentHints,
    ) -> Result<DocumentAnalysis, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let mut analysis = self.analyze_text(&text, hints);
        analysis.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            total = ?analysis.reconciliation.total.value,
            provenance = %analysis.reconciliation.total.provenance,
            "processed document"
        );
        Ok(analysis)
    }
}

fn scored(result: Option<&EntityResult>) -> Option<ScoredAmount> {
    let r = result?;
    let amount = r.value.as_ref()?.as_decimal()?;
    Some(ScoredAmount::new(Money::from_decimal(amount), r.confidence))
}

fn reconcile_input(
    doc: &Document,
    entities: &BTreeMap<Entity, EntityResult>,
    items: &LineItems,
    hints: &DocumentHints,
) -> ReconcileInput {
    let total = entities.get(&Entity::Total);
    ReconcileInput {
        lines: doc.lines().to_vec(),
        regex_total: scored(total),
        regex_line: total.and_then(|r| r.winner()).map(|c| c.raw_text.clone()),
        line_items: items.amounts(),
        line_items_conf: items.confidence,
        tax: scored(entities.get(&Entity::Tax)),
        semantic: hints.semantic,
        ocr_confidence: hints.ocr_confidence,
        aligned: hints.aligned.clone(),
        legacy: hints.legacy,
    }
}
