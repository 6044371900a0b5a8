use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::ArtifactError;
use crate::hash;
use crate::model::CalibrationModel;

/// A parsed artifact plus the identity of the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArtifact {
    pub model: CalibrationModel,
    pub path: PathBuf,
    pub sha256: String,
}

impl LoadedArtifact {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let model = CalibrationModel::from_json(&text)?;
        Ok(LoadedArtifact {
            model,
            path: path.to_path_buf(),
            sha256: hash::artifact_fingerprint(&bytes),
        })
    }
}

type CacheKey = (String, PathBuf);

/// Successfully loaded artifacts keyed by `(entity, path)`.
///
/// Reads take a shared lock; a miss takes the write lock and re-checks before
/// loading, so concurrent first lookups load the file once. Failed loads are not
/// cached, so a fixed artifact is picked up on the next call.
#[derive(Debug, Default)]
pub struct CalibrationCache {
    entries: RwLock<HashMap<CacheKey, Arc<LoadedArtifact>>>,
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<CalibrationCache> {
        static GLOBAL: OnceLock<Arc<CalibrationCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(CalibrationCache::new())).clone()
    }

    pub fn get_or_load(
        &self,
        entity: &str,
        path: &Path,
    ) -> Result<Arc<LoadedArtifact>, ArtifactError> {
        let key = (entity.to_string(), path.to_path_buf());
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = entries.get(&key) {
                return Ok(hit.clone());
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = entries.get(&key) {
            return Ok(hit.clone());
        }
        let loaded = Arc::new(LoadedArtifact::load(path)?);
        tracing::debug!(
            entity,
            path = %path.display(),
            version = %loaded.model.version,
            "calibration artifact cached"
        );
        entries.insert(key, loaded.clone());
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached artifact.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const ARTIFACT: &str = r#"{"entity":"total","version":"v1","type":"piecewise_linear","breakpoints":[[0,0],[1,1]]}"#;

    #[test]
    fn caches_after_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("total.json");
        std::fs::write(&path, ARTIFACT).unwrap();

        let cache = CalibrationCache::new();
        let first = cache.get_or_load("total", &path).unwrap();
        // Rewriting the file does not affect the cached copy.
        std::fs::write(&path, "garbage").unwrap();
        let second = cache.get_or_load("total", &path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("total.json");
        std::fs::write(&path, ARTIFACT).unwrap();

        let cache = CalibrationCache::new();
        cache.get_or_load("total", &path).unwrap();
        std::fs::write(&path, "garbage").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(matches!(
            cache.get_or_load("total", &path),
            Err(ArtifactError::Schema(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new();
        let r = cache.get_or_load("total", &dir.path().join("nope.json"));
        assert!(matches!(r, Err(ArtifactError::NotFound(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_per_entity_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("total.json");
        std::fs::write(&path, ARTIFACT).unwrap();
        let cache = CalibrationCache::new();
        cache.get_or_load("total", &path).unwrap();
        cache.get_or_load("tax", &path).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_lookups_share_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("total.json");
        std::fs::write(&path, ARTIFACT).unwrap();
        let cache = Arc::new(CalibrationCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let path = path.clone();
                thread::spawn(move || cache.get_or_load("total", &path).unwrap())
            })
            .collect();
        let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
