//! Marshalling errors
//!
//! Every error is a structured value. Callers building API responses use
//! [`MarshalError::code`] and [`MarshalError::to_json`] rather than parsing
//! the message.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::convert::{ConversionError, ConvertFailure};
use crate::schema::{FieldDescriptor, SchemaError};
use crate::store::StoreError;

/// Result type for marshalling operations
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Failure of a deserialize, patch, serialize or criteria call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// `null` supplied for a field that forbids it
    #[error("field {} of model {model} is not nullable", .field.json_key)]
    FieldNotNullable {
        model: String,
        field: Box<FieldDescriptor>,
    },

    /// Value could not be converted to the field's type
    #[error("invalid value {value} for field {} of model {model}: {reason}", .field.json_key)]
    FieldValueError {
        model: String,
        field: Box<FieldDescriptor>,
        value: Value,
        reason: ConversionError,
    },

    /// Required key absent when creating a record
    #[error("missing key {} for model {model}", .field.json_key)]
    MissingKey {
        model: String,
        field: Box<FieldDescriptor>,
    },

    /// Document keys no field consumed
    #[error("invalid keys for model {model}: {}", join_keys(.keys))]
    InvalidKeys {
        model: String,
        keys: BTreeSet<String>,
    },

    /// Another record already holds the value of a unique field
    #[error("value {value} for {json_key} of model {model} is not unique")]
    NonUniqueValue {
        model: String,
        json_key: String,
        value: Value,
    },

    /// Secret plaintext below the field minimum
    #[error("password for {json_key} too short ({actual_length} / {minimum_length} characters)")]
    PasswordTooShort {
        model: String,
        json_key: String,
        actual_length: usize,
        minimum_length: usize,
    },

    #[error("invalid cascade: {0}")]
    InvalidCascade(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().cloned().collect::<Vec<_>>().join(", ")
}

impl MarshalError {
    /// Attaches model and field context to a failed conversion.
    pub(crate) fn from_failure(
        model: &str,
        field: &FieldDescriptor,
        value: &Value,
        failure: ConvertFailure,
    ) -> Self {
        match failure {
            ConvertFailure::Null => MarshalError::FieldNotNullable {
                model: model.to_string(),
                field: Box::new(field.clone()),
            },
            ConvertFailure::Conversion(ConversionError::PasswordTooShort {
                actual_length,
                minimum_length,
            }) => MarshalError::PasswordTooShort {
                model: model.to_string(),
                json_key: field.json_key.clone(),
                actual_length,
                minimum_length,
            },
            ConvertFailure::Conversion(reason) => MarshalError::FieldValueError {
                model: model.to_string(),
                field: Box::new(field.clone()),
                value: value.clone(),
                reason,
            },
        }
    }

    /// Stable machine-readable identifier
    pub fn code(&self) -> &'static str {
        match self {
            MarshalError::FieldNotNullable { .. } => "FIELD_NOT_NULLABLE",
            MarshalError::FieldValueError { .. } => "FIELD_VALUE_ERROR",
            MarshalError::MissingKey { .. } => "MISSING_KEY",
            MarshalError::InvalidKeys { .. } => "INVALID_KEYS",
            MarshalError::NonUniqueValue { .. } => "NON_UNIQUE_VALUE",
            MarshalError::PasswordTooShort { .. } => "PASSWORD_TOO_SHORT",
            MarshalError::InvalidCascade(_) => "INVALID_CASCADE",
            MarshalError::Schema(e) => e.code(),
            MarshalError::Store(e) => e.code(),
        }
    }

    /// Document key the error refers to, if any
    pub fn json_key(&self) -> Option<&str> {
        match self {
            MarshalError::FieldNotNullable { field, .. }
            | MarshalError::FieldValueError { field, .. }
            | MarshalError::MissingKey { field, .. } => Some(&field.json_key),
            MarshalError::NonUniqueValue { json_key, .. }
            | MarshalError::PasswordTooShort { json_key, .. } => Some(json_key),
            _ => None,
        }
    }

    /// Descriptor of the offending field, if any
    pub fn field(&self) -> Option<&FieldDescriptor> {
        match self {
            MarshalError::FieldNotNullable { field, .. }
            | MarshalError::FieldValueError { field, .. }
            | MarshalError::MissingKey { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Structured payload: `code`, `message` and the variant's fields
    pub fn to_json(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("code".into(), json!(self.code()));
        payload.insert("message".into(), json!(self.to_string()));

        match self {
            MarshalError::FieldNotNullable { model, field }
            | MarshalError::MissingKey { model, field } => {
                insert_field(&mut payload, model, field);
            }
            MarshalError::FieldValueError {
                model,
                field,
                value,
                reason,
            } => {
                insert_field(&mut payload, model, field);
                payload.insert("value".into(), value.clone());
                payload.insert("reason".into(), json!(reason.to_string()));
                if let ConversionError::InvalidEnumerationValue { allowed, .. } = reason {
                    payload.insert("allowed".into(), json!(allowed));
                }
            }
            MarshalError::InvalidKeys { model, keys } => {
                payload.insert("model".into(), json!(model));
                payload.insert("keys".into(), json!(keys));
            }
            MarshalError::NonUniqueValue {
                model,
                json_key,
                value,
            } => {
                payload.insert("model".into(), json!(model));
                payload.insert("key".into(), json!(json_key));
                payload.insert("value".into(), value.clone());
            }
            MarshalError::PasswordTooShort {
                model,
                json_key,
                actual_length,
                minimum_length,
            } => {
                payload.insert("model".into(), json!(model));
                payload.insert("key".into(), json!(json_key));
                payload.insert("actual_length".into(), json!(actual_length));
                payload.insert("minimum_length".into(), json!(minimum_length));
            }
            MarshalError::InvalidCascade(_)
            | MarshalError::Schema(_)
            | MarshalError::Store(_) => {}
        }

        Value::Object(payload)
    }
}

fn insert_field(payload: &mut Map<String, Value>, model: &str, field: &FieldDescriptor) {
    payload.insert("model".into(), json!(model));
    payload.insert("key".into(), json!(field.json_key));
    payload.insert("attribute".into(), json!(field.attribute));
    payload.insert("type".into(), json!(field.type_tag.type_name()));
}
