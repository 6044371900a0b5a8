use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_ENABLED: &str = "PROVENA_CALIBRATION_ENABLED";
pub const ENV_ARTIFACT_PATH: &str = "PROVENA_CALIBRATION_ARTIFACT_PATH";
pub const ENV_ENTITY_FILTER: &str = "PROVENA_CALIBRATION_ENTITY_FILTER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Calibration flags. Disabled unless explicitly turned on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    #[serde(default)]
    pub calibration_enabled: bool,
    /// Required when enabled; a missing path falls back to raw confidence.
    #[serde(default)]
    pub calibration_artifact_path: Option<PathBuf>,
    /// Comma-separated entity names; when set, other entities are never calibrated.
    #[serde(default)]
    pub calibration_entity_filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    calibration: CalibrationSettings,
}

impl CalibrationSettings {
    pub fn enabled(path: impl Into<PathBuf>) -> Self {
        Self {
            calibration_enabled: true,
            calibration_artifact_path: Some(path.into()),
            calibration_entity_filter: None,
        }
    }

    /// Parse the `[calibration]` table of a TOML config document.
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(toml_content)?;
        Ok(file.calibration)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Overlay `PROVENA_CALIBRATION_*` environment variables.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup(ENV_ENABLED) {
            self.calibration_enabled = parse_bool(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_ENABLED.to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup(ENV_ARTIFACT_PATH) {
            self.calibration_artifact_path = non_blank(v).map(PathBuf::from);
        }
        if let Some(v) = lookup(ENV_ENTITY_FILTER) {
            self.calibration_entity_filter = non_blank(v);
        }
        Ok(self)
    }

    /// Whether `entity` passes the optional filter. A blank filter allows everything.
    pub fn allows_entity(&self, entity: &str) -> bool {
        match self.calibration_entity_filter.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(filter) => filter
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .any(|f| f.eq_ignore_ascii_case(entity)),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn non_blank(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
