//! File-backed model registry.
//!
//! Holds the versioned promote/archive state for one registered model.
//! `transition` archives the current Production version and appends the
//! candidate as the next version. The registry is only ever driven by a
//! promotion decision — it performs the transition, it never decides.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle stage of a registered model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Production,
    Archived,
}

/// A model candidate awaiting registration: a name plus its metric bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub model_name: String,
    /// Flattened metric bundle, e.g. `clv_pp_mean`, `n`.
    pub metrics: BTreeMap<String, f64>,
}

impl ModelCandidate {
    /// Deterministic content-addressed id over the serialized bundle.
    ///
    /// Two candidates with identical metric bundles share an id, which makes
    /// registry entries traceable back to the summary that produced them.
    pub fn candidate_id(&self) -> String {
        let json = serde_json::to_string(self).expect("ModelCandidate serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// One registered version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub version: u32,
    pub candidate_id: String,
    pub stage: Stage,
    pub metrics: BTreeMap<String, f64>,
    pub promoted_at: DateTime<Utc>,
}

/// Persisted registry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegistryState {
    model_name: String,
    versions: Vec<ModelVersion>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry holds model '{found}', expected '{expected}'")]
    ModelMismatch { expected: String, found: String },

    #[error("candidate is for model '{candidate}', registry is for '{registry}'")]
    WrongModel { candidate: String, registry: String },
}

/// JSON-file registry for a single model name.
pub struct FileRegistry {
    path: PathBuf,
    model_name: String,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model_name: model_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn load(&self) -> Result<RegistryState, RegistryError> {
        if !self.path.exists() {
            return Ok(RegistryState {
                model_name: self.model_name.clone(),
                versions: Vec::new(),
            });
        }
        let text = fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let state: RegistryState =
            serde_json::from_str(&text).map_err(|source| RegistryError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })?;
        if state.model_name != self.model_name {
            return Err(RegistryError::ModelMismatch {
                expected: self.model_name.clone(),
                found: state.model_name,
            });
        }
        Ok(state)
    }

    fn save(&self, state: &RegistryState) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| RegistryError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegistryError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| RegistryError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Current Production version, if any.
    pub fn production(&self) -> Result<Option<ModelVersion>, RegistryError> {
        Ok(self
            .load()?
            .versions
            .into_iter()
            .find(|v| v.stage == Stage::Production))
    }

    /// All registered versions, oldest first.
    pub fn versions(&self) -> Result<Vec<ModelVersion>, RegistryError> {
        Ok(self.load()?.versions)
    }

    /// Archive the current Production version and register the candidate as
    /// the next version in Production.
    pub fn transition(&self, candidate: &ModelCandidate) -> Result<ModelVersion, RegistryError> {
        if candidate.model_name != self.model_name {
            return Err(RegistryError::WrongModel {
                candidate: candidate.model_name.clone(),
                registry: self.model_name.clone(),
            });
        }
        let mut state = self.load()?;
        for version in &mut state.versions {
            if version.stage == Stage::Production {
                version.stage = Stage::Archived;
            }
        }
        let next = ModelVersion {
            version: state.versions.len() as u32 + 1,
            candidate_id: candidate.candidate_id(),
            stage: Stage::Production,
            metrics: candidate.metrics.clone(),
            promoted_at: Utc::now(),
        };
        state.versions.push(next.clone());
        self.save(&state)?;
        tracing::info!(
            model = %self.model_name,
            version = next.version,
            candidate_id = %next.candidate_id,
            "model version promoted to Production"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(mean: f64) -> ModelCandidate {
        let mut metrics = BTreeMap::new();
        metrics.insert("clv_pp_mean".to_string(), mean);
        metrics.insert("n".to_string(), 900.0);
        ModelCandidate {
            model_name: "clv_policy".to_string(),
            metrics,
        }
    }

    #[test]
    fn empty_registry_has_no_production() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("registry.json"), "clv_policy");
        assert!(registry.production().unwrap().is_none());
    }

    #[test]
    fn transition_archives_previous_production() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("registry.json"), "clv_policy");

        let v1 = registry.transition(&candidate(0.015)).unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.stage, Stage::Production);

        let v2 = registry.transition(&candidate(0.022)).unwrap();
        assert_eq!(v2.version, 2);

        let versions = registry.versions().unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].stage, Stage::Archived);
        assert_eq!(versions[1].stage, Stage::Production);
        assert_eq!(
            registry.production().unwrap().unwrap().candidate_id,
            v2.candidate_id
        );
    }

    #[test]
    fn candidate_id_is_deterministic() {
        assert_eq!(candidate(0.02).candidate_id(), candidate(0.02).candidate_id());
        assert_ne!(candidate(0.02).candidate_id(), candidate(0.03).candidate_id());
    }

    #[test]
    fn wrong_model_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("registry.json"), "other_model");
        let err = registry.transition(&candidate(0.02)).unwrap_err();
        assert!(matches!(err, RegistryError::WrongModel { .. }));
    }

    #[test]
    fn model_name_mismatch_on_disk_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        FileRegistry::new(&path, "clv_policy")
            .transition(&candidate(0.02))
            .unwrap();
        let other = FileRegistry::new(&path, "different_model");
        let err = other.production().unwrap_err();
        assert!(matches!(err, RegistryError::ModelMismatch { .. }));
    }
}
