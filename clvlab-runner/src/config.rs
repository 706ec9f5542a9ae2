//! Pipeline and threshold configuration.
//!
//! Everything the pipeline needs is explicit file configuration — webhook and
//! registry settings included. Nothing is read from ambient process
//! environment. Threshold loading fails closed: a missing or out-of-range
//! key is a fatal error at load time, never a silently-permissive gate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use clvlab_core::dq::DqConfig;
use clvlab_core::{RetryPolicy, Source, ThresholdConfig};

use crate::ingest::IngestConfig;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("duplicate source name '{name}'")]
    DuplicateSource { name: String },

    #[error("no sources configured")]
    NoSources,

    #[error("missing required threshold key '{key}'")]
    MissingKey { key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Fetch/retry settings as written in TOML (durations in integral units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            timeout_secs: 10,
        }
    }
}

/// Tracked metrics; `primary` drives the promotion gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSettings {
    pub primary: String,
    pub tracked: Vec<String>,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            primary: "clv_pp".into(),
            tracked: vec!["clv_pp".into(), "pnl".into()],
        }
    }
}

/// Notification settings. `None` disables posting entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub webhook_url: Option<String>,
}

/// Model registry location and the registered model's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub path: PathBuf,
    pub model_name: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("artifacts/registry.json"),
            model_name: "clv_policy".into(),
        }
    }
}

/// Top-level pipeline configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<Source>,
    pub fetch: FetchSettings,
    pub dq: DqConfig,
    pub metrics: MetricSettings,
    pub notify: NotifySettings,
    pub registry: RegistrySettings,
}

impl PipelineConfig {
    /// Load and validate a pipeline config from TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: PipelineConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Source names must be unique within a run; at least one is required.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = std::collections::BTreeSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            retry: RetryPolicy {
                max_attempts: self.fetch.max_attempts,
                base_delay: Duration::from_millis(self.fetch.base_delay_ms),
                max_delay: Duration::from_millis(self.fetch.max_delay_ms),
            },
            dq: self.dq.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

/// Load a threshold file for the given primary metric.
///
/// Required keys: `n_min` (integer >= 1), `<metric>_mean_min` (float),
/// `p_value_max` (float in the open interval (0, 1)).
pub fn load_thresholds(path: &Path, metric: &str) -> Result<ThresholdConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let table: toml::Value = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let n_min = table
        .get("n_min")
        .ok_or_else(|| ConfigError::MissingKey {
            key: "n_min".into(),
        })?
        .as_integer()
        .filter(|&n| n >= 1)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "n_min".into(),
            reason: "must be an integer >= 1".into(),
        })? as usize;

    let mean_key = format!("{metric}_mean_min");
    let metric_mean_min = toml_float(&table, &mean_key)?;

    let p_value_max = toml_float(&table, "p_value_max")?;
    if !(p_value_max > 0.0 && p_value_max < 1.0) {
        return Err(ConfigError::InvalidValue {
            key: "p_value_max".into(),
            reason: "must lie in (0, 1)".into(),
        });
    }

    Ok(ThresholdConfig {
        n_min,
        metric_mean_min,
        p_value_max,
    })
}

fn toml_float(table: &toml::Value, key: &str) -> Result<f64, ConfigError> {
    let value = table
        .get(key)
        .ok_or_else(|| ConfigError::MissingKey { key: key.into() })?;
    value
        .as_float()
        .or_else(|| value.as_integer().map(|n| n as f64))
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.into(),
            reason: "must be a number".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn pipeline_config_round_trip() {
        let (_dir, path) = write_toml(
            r#"
            [[sources]]
            name = "pinnacle"
            endpoint = "https://feeds.example/pinnacle"

            [[sources]]
            name = "sbo"
            endpoint = "https://feeds.example/sbo"

            [fetch]
            max_attempts = 3
            base_delay_ms = 100
            max_delay_ms = 800
            timeout_secs = 5

            [metrics]
            primary = "clv_pp"
            tracked = ["clv_pp"]
            "#,
        );
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.ingest_config().retry.base_delay.as_millis(), 100);
        assert_eq!(config.dq.min_rows_per_source, 50);
    }

    #[test]
    fn duplicate_source_rejected() {
        let (_dir, path) = write_toml(
            r#"
            [[sources]]
            name = "pinnacle"
            endpoint = "https://a"

            [[sources]]
            name = "pinnacle"
            endpoint = "https://b"
            "#,
        );
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSource { .. }));
    }

    #[test]
    fn empty_sources_rejected() {
        let (_dir, path) = write_toml("");
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn thresholds_happy_path() {
        let (_dir, path) = write_toml("n_min = 300\nclv_pp_mean_min = 0.010\np_value_max = 0.05\n");
        let thresholds = load_thresholds(&path, "clv_pp").unwrap();
        assert_eq!(thresholds.n_min, 300);
        assert_eq!(thresholds.metric_mean_min, 0.010);
        assert_eq!(thresholds.p_value_max, 0.05);
    }

    #[test]
    fn missing_metric_floor_fails_closed() {
        let (_dir, path) = write_toml("n_min = 300\np_value_max = 0.05\n");
        let err = load_thresholds(&path, "clv_pp").unwrap_err();
        match err {
            ConfigError::MissingKey { key } => assert_eq!(key, "clv_pp_mean_min"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn p_value_ceiling_must_be_in_unit_interval() {
        let (_dir, path) = write_toml("n_min = 300\nclv_pp_mean_min = 0.01\np_value_max = 1.5\n");
        let err = load_thresholds(&path, "clv_pp").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn integer_floor_accepted_as_float() {
        let (_dir, path) = write_toml("n_min = 300\nclv_pp_mean_min = 0\np_value_max = 0.05\n");
        let thresholds = load_thresholds(&path, "clv_pp").unwrap();
        assert_eq!(thresholds.metric_mean_min, 0.0);
    }
}
