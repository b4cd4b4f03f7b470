//! Engine configuration
//!
//! Defaults for the schema registry and for per-call marshalling options.
//! Every key is optional in the JSON form.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::SecretHash;
use crate::marshal::UnknownKeys;
use crate::observability::{Logger, Severity};
use crate::schema::{KeyConvention, SchemaRegistry};

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "CONFIG_IO",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Marshalling engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshalConfig {
    /// Naming convention for keys without an explicit override (default: camel_case)
    #[serde(default)]
    pub key_convention: KeyConvention,

    /// Minimum plaintext length for secret fields that declare none (default: 8)
    #[serde(default = "default_min_secret_length")]
    pub min_secret_length: usize,

    /// Hard ceiling on nested cascade hops (default: 16)
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: usize,

    /// Emit `null` values when serializing (default: false)
    #[serde(default)]
    pub include_nulls: bool,

    /// Handling of leftover document keys (default: reject)
    #[serde(default)]
    pub unknown_keys: UnknownKeys,

    /// Minimum log severity (default: warn)
    #[serde(default)]
    pub log_level: Severity,
}

fn default_min_secret_length() -> usize {
    SecretHash::DEFAULT_MIN_LENGTH
}

fn default_max_cascade_depth() -> usize {
    16
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            key_convention: KeyConvention::default(),
            min_secret_length: default_min_secret_length(),
            max_cascade_depth: default_max_cascade_depth(),
            include_nulls: false,
            unknown_keys: UnknownKeys::default(),
            log_level: Severity::default(),
        }
    }
}

impl MarshalConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parses configuration from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: MarshalConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cascade_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_cascade_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Determines whether `registry` was built with this configuration's
    /// key convention and secret minimum.
    pub fn agrees_with(&self, registry: &SchemaRegistry) -> bool {
        registry.convention() == self.key_convention
            && registry.min_secret_length() == self.min_secret_length
    }

    /// Applies `log_level` to the process-wide logger.
    pub fn init_logging(&self) {
        Logger::set_min_severity(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = MarshalConfig::default();
        assert_eq!(config.key_convention, KeyConvention::CamelCase);
        assert_eq!(config.min_secret_length, 8);
        assert_eq!(config.max_cascade_depth, 16);
        assert!(!config.include_nulls);
        assert_eq!(config.unknown_keys, UnknownKeys::Reject);
        assert_eq!(config.log_level, Severity::Warn);
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = MarshalConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MarshalConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = MarshalConfig::from_json_str(
            r#"{"key_convention": "snake_case", "unknown_keys": "reject_undeclared", "log_level": "trace"}"#,
        )
        .unwrap();
        assert_eq!(config.key_convention, KeyConvention::SnakeCase);
        assert_eq!(config.unknown_keys, UnknownKeys::RejectUndeclared);
        assert_eq!(config.log_level, Severity::Trace);
        assert_eq!(config.max_cascade_depth, 16);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = MarshalConfig::from_json_str(r#"{"max_cascade_depth": 0}"#).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn test_malformed_json() {
        let err = MarshalConfig::from_json_str("{").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"include_nulls": true, "min_secret_length": 12}}"#).unwrap();

        let config = MarshalConfig::from_file(file.path()).unwrap();
        assert!(config.include_nulls);
        assert_eq!(config.min_secret_length, 12);
    }

    #[test]
    fn test_agrees_only_with_registry_built_from_it() {
        let config = MarshalConfig::from_json_str(
            r#"{"key_convention": "snake_case", "min_secret_length": 12}"#,
        )
        .unwrap();

        assert!(config.agrees_with(&SchemaRegistry::from_config(&config)));
        assert!(!config.agrees_with(&SchemaRegistry::new()));
        assert!(!config.agrees_with(&SchemaRegistry::with_convention(KeyConvention::SnakeCase)));
        assert!(MarshalConfig::default().agrees_with(&SchemaRegistry::new()));
    }

    #[test]
    fn test_missing_file() {
        let err = MarshalConfig::from_file("/nonexistent/recordjson.json").unwrap_err();
        assert_eq!(err.code(), "CONFIG_IO");
    }
}
