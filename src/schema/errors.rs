//! Schema registry error types
//!
//! Error codes:
//! - SCHEMA_MALFORMED_MODEL
//! - SCHEMA_MODEL_IMMUTABLE
//! - SCHEMA_UNKNOWN_MODEL
//! - SCHEMA_UNKNOWN_PARENT
//! - SCHEMA_INHERITANCE_CYCLE
//! - SCHEMA_NOT_A_FIELD
//! - SCHEMA_DUPLICATE_JSON_KEY
//! - SCHEMA_IO
//! - SCHEMA_REGISTRY_POISONED

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while registering or resolving model definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Definition failed its structural checks
    #[error("Malformed model '{model}': {reason}")]
    MalformedModel { model: String, reason: String },

    /// A model of that name is already registered
    #[error("Model '{0}' is already registered and immutable")]
    ModelImmutable(String),

    /// No model of that name is registered
    #[error("Model '{0}' not found")]
    UnknownModel(String),

    /// A model extends a parent that is not registered
    #[error("Model '{model}' extends unknown parent '{parent}'")]
    UnknownParent { model: String, parent: String },

    /// A model's parent chain loops back on itself
    #[error("Inheritance cycle through model '{0}'")]
    InheritanceCycle(String),

    /// A key table names an attribute the model does not declare
    #[error("Key table of '{model}' names '{attribute}', which is not a field")]
    NotAField { model: String, attribute: String },

    /// Two attributes resolve to the same document key
    #[error("Duplicate JSON key '{key}' in '{model}' (attributes '{first}' and '{second}')")]
    DuplicateJsonKey {
        model: String,
        key: String,
        first: String,
        second: String,
    },

    /// A model file could not be read, parsed or written
    #[error("Model file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// A registry lock was poisoned by a panicking writer
    #[error("Schema registry lock poisoned")]
    RegistryPoisoned,
}

impl SchemaError {
    pub(crate) fn malformed(model: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedModel {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::MalformedModel { .. } => "SCHEMA_MALFORMED_MODEL",
            SchemaError::ModelImmutable(_) => "SCHEMA_MODEL_IMMUTABLE",
            SchemaError::UnknownModel(_) => "SCHEMA_UNKNOWN_MODEL",
            SchemaError::UnknownParent { .. } => "SCHEMA_UNKNOWN_PARENT",
            SchemaError::InheritanceCycle(_) => "SCHEMA_INHERITANCE_CYCLE",
            SchemaError::NotAField { .. } => "SCHEMA_NOT_A_FIELD",
            SchemaError::DuplicateJsonKey { .. } => "SCHEMA_DUPLICATE_JSON_KEY",
            SchemaError::Io { .. } => "SCHEMA_IO",
            SchemaError::RegistryPoisoned => "SCHEMA_REGISTRY_POISONED",
        }
    }
}
