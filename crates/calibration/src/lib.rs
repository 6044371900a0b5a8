//! Optional, gated, fail-safe remapping of raw entity confidence through a
//! versioned piecewise-linear artifact.

pub mod cache;
pub mod calibrator;
pub mod config;
pub mod error;
pub mod hash;
pub mod model;

pub use cache::{CalibrationCache, LoadedArtifact};
pub use calibrator::{CalibrationMetadata, Calibrator};
pub use config::{CalibrationSettings, ConfigError};
pub use error::{ArtifactError, FallbackReason};
pub use model::{Breakpoint, CalibrationModel, CalibratorType};
