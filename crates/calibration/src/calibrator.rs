use serde::{Deserialize, Serialize};
use std::sync::Arc;

use provena_core::{clamp_confidence, Evidence};

use crate::cache::CalibrationCache;
use crate::config::CalibrationSettings;
use crate::error::FallbackReason;

/// What happened when calibration was attempted. Every key is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    pub applied: bool,
    pub entity: String,
    pub version: Option<String>,
    pub path: Option<String>,
    pub calibrator_type: Option<String>,
    pub artifact_sha256: Option<String>,
    pub raw: f32,
    pub calibrated: f32,
    pub delta: f32,
    pub reason: Option<FallbackReason>,
}

impl CalibrationMetadata {
    fn passthrough(entity: &str, raw: f32) -> Self {
        Self {
            applied: false,
            entity: entity.to_string(),
            version: None,
            path: None,
            calibrator_type: None,
            artifact_sha256: None,
            raw,
            calibrated: raw,
            delta: 0.0,
            reason: None,
        }
    }

    /// Metadata for a result that was never offered to the gate.
    pub fn skipped(entity: &str, raw: f32, reason: FallbackReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::passthrough(entity, clamp_confidence(raw))
        }
    }
}

/// Runs the calibration gate against a shared artifact cache.
#[derive(Debug, Clone)]
pub struct Calibrator {
    settings: CalibrationSettings,
    cache: Arc<CalibrationCache>,
}

impl Calibrator {
    /// Use the process-wide artifact cache.
    pub fn new(settings: CalibrationSettings) -> Self {
        Self::with_cache(settings, CalibrationCache::global())
    }

    pub fn with_cache(settings: CalibrationSettings, cache: Arc<CalibrationCache>) -> Self {
        Self { settings, cache }
    }

    pub fn disabled() -> Self {
        Self::new(CalibrationSettings::default())
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Remap `raw` for `entity`. Never fails: any gate failure returns the raw
    /// confidence unchanged with `applied == false` and a reason code.
    pub fn apply(&self, entity: &str, raw: f32, features: &Evidence) -> (f32, CalibrationMetadata) {
        let raw = clamp_confidence(raw);
        let mut meta = CalibrationMetadata::passthrough(entity, raw);

        match self.run_gate(entity, raw, features, &mut meta) {
            Ok(calibrated) => {
                meta.applied = true;
                meta.calibrated = calibrated;
                meta.delta = calibrated - raw;
                tracing::debug!(entity, raw, calibrated, "confidence calibrated");
                (calibrated, meta)
            }
            Err(reason) => {
                tracing::debug!(entity, %reason, "calibration skipped");
                meta.reason = Some(reason);
                (raw, meta)
            }
        }
    }

    fn run_gate(
        &self,
        entity: &str,
        raw: f32,
        features: &Evidence,
        meta: &mut CalibrationMetadata,
    ) -> Result<f32, FallbackReason> {
        if !self.settings.calibration_enabled {
            return Err(FallbackReason::CalibrationDisabled);
        }

        let path = self
            .settings
            .calibration_artifact_path
            .as_deref()
            .ok_or(FallbackReason::MissingArtifactPath)?;
        meta.path = Some(path.display().to_string());

        if !self.settings.allows_entity(entity) {
            return Err(FallbackReason::EntityFilterMismatch);
        }

        let artifact = self.cache.get_or_load(entity, path).map_err(|e| {
            tracing::warn!(entity, error = %e, "calibration artifact unusable");
            e.fallback_reason()
        })?;
        let model = &artifact.model;
        meta.version = Some(model.version.clone());
        meta.calibrator_type = Some(model.calibrator_type.to_string());
        meta.artifact_sha256 = Some(artifact.sha256.clone());

        if model.entity != entity {
            return Err(FallbackReason::ArtifactEntityMismatch);
        }

        if let Some(missing) = model.required_features.iter().find(|f| !features.has(f)) {
            tracing::debug!(entity, feature = %missing, "required calibration feature missing");
            return Err(FallbackReason::MissingRequiredFeature);
        }

        Ok(model.apply(raw))
    }
}
