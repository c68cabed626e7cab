//! Register configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `QBDT_` prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables shared by every register built from this configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QbdtConfig {
    /// Squared-magnitude threshold below which a scale counts as zero and
    /// within which two scales count as equal.
    #[serde(default = "default_separability_threshold")]
    pub separability_threshold: f64,

    /// A node is renormalized only when its children's total probability
    /// differs from 1 by more than this.
    #[serde(default = "default_normalize_threshold")]
    pub normalize_threshold: f64,

    /// Worker threads for parallel traversal (`None`: one per core).
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Seed for measurement randomness (`None`: entropy).
    #[serde(default)]
    pub seed: Option<u64>,

    /// Widest register that may be materialized as a dense vector.
    #[serde(default = "default_max_dense_qubits")]
    pub max_dense_qubits: usize,

    /// Re-compress the tree after every structural mutation.
    #[serde(default = "default_true")]
    pub auto_prune: bool,
}

fn default_separability_threshold() -> f64 {
    1e-12
}

fn default_normalize_threshold() -> f64 {
    1e-10
}

fn default_max_dense_qubits() -> usize {
    28
}

fn default_true() -> bool {
    true
}

impl Default for QbdtConfig {
    fn default() -> Self {
        Self {
            separability_threshold: default_separability_threshold(),
            normalize_threshold: default_normalize_threshold(),
            worker_threads: None,
            seed: None,
            max_dense_qubits: default_max_dense_qubits(),
            auto_prune: true,
        }
    }
}

impl QbdtConfig {
    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: QbdtConfig =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml_str(&contents)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let config = if let Some(path) = config_file {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Builder: fix the measurement seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder: fix the worker count.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Only variables present in the environment override current values;
    /// unparsable values are ignored.
    fn merge_env(mut self) -> Self {
        if let Some(v) = env_parse("QBDT_SEPARABILITY_THRESHOLD") {
            self.separability_threshold = v;
        }
        if let Some(v) = env_parse("QBDT_NORMALIZE_THRESHOLD") {
            self.normalize_threshold = v;
        }
        if let Some(v) = env_parse("QBDT_THREADS") {
            self.worker_threads = Some(v);
        }
        if let Some(v) = env_parse("QBDT_SEED") {
            self.seed = Some(v);
        }
        if let Some(v) = env_parse("QBDT_MAX_DENSE_QUBITS") {
            self.max_dense_qubits = v;
        }
        if let Some(v) = env_parse("QBDT_AUTO_PRUNE") {
            self.auto_prune = v;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("separability_threshold", self.separability_threshold),
            ("normalize_threshold", self.normalize_threshold),
        ] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must lie in [0, 1), got {value}"
                )));
            }
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "worker_threads must be greater than 0".to_string(),
            ));
        }
        if self.max_dense_qubits >= usize::BITS as usize {
            return Err(ConfigError::ValidationError(format!(
                "max_dense_qubits must be below {}",
                usize::BITS
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QbdtConfig::default();
        assert_eq!(config.separability_threshold, 1e-12);
        assert_eq!(config.max_dense_qubits, 28);
        assert!(config.auto_prune);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = QbdtConfig::from_yaml_str("seed: 7\nworker_threads: 2\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.normalize_threshold, 1e-10);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = QbdtConfig {
            separability_threshold: 2.0,
            ..QbdtConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let config = QbdtConfig::default().with_worker_threads(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            QbdtConfig::from_file("/nonexistent/qbdt.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            QbdtConfig::from_yaml_str("seed: [not a number"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
