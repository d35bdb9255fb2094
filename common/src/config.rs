use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

use crate::yaml_include::load_yaml_with_includes;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("failed to resolve includes: {0}")]
    Include(String),

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    pub project_name: String,
    pub artifact_dir: String,
    /// Published artifact versions to keep after training. Unset keeps all.
    pub keep_versions: Option<usize>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            project_name: "rides".to_string(),
            artifact_dir: "model".to_string(),
            keep_versions: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CleaningConfig {
    pub raw_path: String,
    pub cleaned_path: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            raw_path: "data/raw_rides.csv".to_string(),
            cleaned_path: "data/cleaned_rides.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    pub dataset_path: String,
    pub test_fraction: f64,
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Refuse to publish when holdout accuracy falls below this value.
    /// Unset means accuracy is reported only.
    pub min_accuracy: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/cleaned_rides.csv".to_string(),
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_accuracy: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub log_level: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Loads a source config file, resolving `!include` lines first.
    pub fn load_with_includes(config_path: &Path) -> Result<Self, ConfigError> {
        let yaml = load_yaml_with_includes(config_path)
            .map_err(|e| ConfigError::Include(e.to_string()))?;

        let mut out_str = String::new();
        {
            let mut emitter = yaml_rust2::YamlEmitter::new(&mut out_str);
            emitter
                .dump(&yaml)
                .map_err(|e| ConfigError::Include(e.to_string()))?;
        }
        Self::from_yaml_str(&out_str)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(ConfigError::Invalid {
                field: "training.test_fraction",
                message: format!("must be in (0, 1), got {}", training.test_fraction),
            });
        }
        if training.n_estimators == 0 {
            return Err(ConfigError::Invalid {
                field: "training.n_estimators",
                message: "must be positive".to_string(),
            });
        }
        if training.min_samples_split < 2 {
            return Err(ConfigError::Invalid {
                field: "training.min_samples_split",
                message: format!("must be at least 2, got {}", training.min_samples_split),
            });
        }
        if let Some(min_accuracy) = training.min_accuracy {
            if !(0.0..=1.0).contains(&min_accuracy) {
                return Err(ConfigError::Invalid {
                    field: "training.min_accuracy",
                    message: format!("must be in [0, 1], got {}", min_accuracy),
                });
            }
        }
        if self.common.keep_versions == Some(0) {
            return Err(ConfigError::Invalid {
                field: "common.keep_versions",
                message: "must keep at least one version".to_string(),
            });
        }
        if self.common.artifact_dir.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "common.artifact_dir",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_yaml_str("common:\n  project_name: rides\n  artifact_dir: out\n").unwrap();
        assert_eq!(config.common.artifact_dir, "out");
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.n_estimators, 100);
        assert!((config.training.test_fraction - 0.2).abs() < f64::EPSILON);
        assert!(config.training.min_accuracy.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_test_fraction() {
        let err = Config::from_yaml_str("training:\n  test_fraction: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "training.test_fraction", .. }));
    }

    #[test]
    fn test_rejects_out_of_range_min_accuracy() {
        let err = Config::from_yaml_str("training:\n  min_accuracy: 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "training.min_accuracy", .. }));
    }

    #[test]
    fn test_overridden_min_accuracy_is_revalidated() {
        for bad in [f64::NAN, 5.0, -0.1] {
            let mut config = Config::default();
            config.training.min_accuracy = Some(bad);
            let err = config.validate().unwrap_err();
            println!("min_accuracy {} -> {}", bad, err);
            assert!(matches!(err, ConfigError::Invalid { field: "training.min_accuracy", .. }));
        }

        let mut config = Config::default();
        config.training.min_accuracy = Some(0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_keep_versions() {
        let err = Config::from_yaml_str("common:\n  keep_versions: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "common.keep_versions", .. }));

        let config = Config::from_yaml_str("common:\n  keep_versions: 3\n").unwrap();
        assert_eq!(config.common.keep_versions, Some(3));
    }

    #[test]
    fn test_load_with_includes_merges_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let dev = dir.path().join("dev.yaml");
        fs::File::create(&base)
            .unwrap()
            .write_all(b"common:\n  project_name: rides\n  artifact_dir: model\ntraining:\n  seed: 7\n")
            .unwrap();
        fs::File::create(&dev)
            .unwrap()
            .write_all(b"!include base.yaml\ntraining:\n  n_estimators: 10\n")
            .unwrap();

        let config = Config::load_with_includes(&dev).unwrap();
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.n_estimators, 10);
        assert_eq!(config.common.artifact_dir, "model");
    }
}
