use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Calibration artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read calibration artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid calibration artifact: {0}")]
    Schema(String),
}

impl ArtifactError {
    pub fn fallback_reason(&self) -> FallbackReason {
        match self {
            ArtifactError::NotFound(_) => FallbackReason::ArtifactNotFound,
            ArtifactError::Io { .. } | ArtifactError::Schema(_) => FallbackReason::ArtifactSchemaInvalid,
        }
    }
}

/// Why calibration fell back to the raw confidence. Listed in gate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    CalibrationDisabled,
    MissingArtifactPath,
    EntityFilterMismatch,
    ArtifactNotFound,
    ArtifactSchemaInvalid,
    ArtifactEntityMismatch,
    MissingRequiredFeature,
    /// The entity produced no value; confidence stays 0.
    NoValue,
}

impl FallbackReason {
    pub fn code(self) -> &'static str {
        match self {
            FallbackReason::CalibrationDisabled => "calibration_disabled",
            FallbackReason::MissingArtifactPath => "missing_artifact_path",
            FallbackReason::EntityFilterMismatch => "entity_filter_mismatch",
            FallbackReason::ArtifactNotFound => "artifact_not_found",
            FallbackReason::ArtifactSchemaInvalid => "artifact_schema_invalid",
            FallbackReason::ArtifactEntityMismatch => "artifact_entity_mismatch",
            FallbackReason::MissingRequiredFeature => "missing_required_feature",
            FallbackReason::NoValue => "no_value",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_serialized_form() {
        for reason in [
            FallbackReason::CalibrationDisabled,
            FallbackReason::MissingArtifactPath,
            FallbackReason::EntityFilterMismatch,
            FallbackReason::ArtifactNotFound,
            FallbackReason::ArtifactSchemaInvalid,
            FallbackReason::ArtifactEntityMismatch,
            FallbackReason::MissingRequiredFeature,
            FallbackReason::NoValue,
        ] {
            assert_eq!(serde_json::to_value(reason).unwrap(), serde_json::json!(reason.code()));
        }
    }

    #[test]
    fn io_and_schema_errors_map_to_schema_invalid() {
        let e = ArtifactError::Schema("missing entity".into());
        assert_eq!(e.fallback_reason(), FallbackReason::ArtifactSchemaInvalid);
        let e = ArtifactError::NotFound(PathBuf::from("/nope.json"));
        assert_eq!(e.fallback_reason(), FallbackReason::ArtifactNotFound);
    }
}
