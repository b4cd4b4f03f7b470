//! Record store collaborator
//!
//! The marshalling engine never owns persistence. It reads and writes
//! attributes through [`Record`] and consults a [`RecordStore`] for
//! uniqueness checks and cascade lookups.
//!
//! # Invariants
//!
//! - Store failures propagate unchanged; the engine never retries
//! - A store lookup never mutates the caller's record

mod memory;
mod record;

use std::fmt;

use thiserror::Error;

use crate::convert::FieldValue;
use crate::schema::FieldDescriptor;

pub use memory::InMemoryRecordStore;
pub use record::DynamicRecord;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend-specific failure, passed through as text
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("record {model}#{identity} not found")]
    NotFound { model: String, identity: i64 },

    /// The model declares no generated identity field
    #[error("model {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Backend(_) => "STORE_BACKEND",
            StoreError::NotFound { .. } => "STORE_NOT_FOUND",
            StoreError::NoPrimaryKey(_) => "STORE_NO_PRIMARY_KEY",
            StoreError::Poisoned => "STORE_POISONED",
        }
    }
}

/// Attribute access to one record of a registered model
pub trait Record: fmt::Debug {
    /// Name of the model this record belongs to
    fn model(&self) -> &str;

    /// Store-assigned identity, if the record has been persisted
    fn identity(&self) -> Option<i64>;

    /// Reads an attribute; unset attributes read as [`FieldValue::Null`]
    fn read(&self, attribute: &str) -> FieldValue;

    fn assign(&mut self, attribute: &str, value: FieldValue);
}

/// Query surface the engine needs from persistence
pub trait RecordStore: Send + Sync {
    /// Whether a record of `model` other than `exclude_identity` holds
    /// `value` in `field`
    fn exists_matching(
        &self,
        model: &str,
        field: &FieldDescriptor,
        value: &FieldValue,
        exclude_identity: Option<i64>,
    ) -> StoreResult<bool>;

    /// Loads the record of `model` with the given identity
    fn fetch_by_identity(&self, model: &str, identity: i64)
        -> StoreResult<Option<Box<dyn Record>>>;
}

/// One conjunct of a record selection
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Equals { attribute: String, value: FieldValue },
    IsNull { attribute: String },
}

impl Criterion {
    pub fn attribute(&self) -> &str {
        match self {
            Criterion::Equals { attribute, .. } | Criterion::IsNull { attribute } => attribute,
        }
    }

    /// Whether `record` satisfies this criterion
    pub fn matches(&self, record: &dyn Record) -> bool {
        match self {
            Criterion::Equals { attribute, value } => record.read(attribute) == *value,
            Criterion::IsNull { attribute } => record.read(attribute).is_null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::Poisoned.code(), "STORE_POISONED");
        assert_eq!(
            StoreError::NotFound {
                model: "user".into(),
                identity: 3
            }
            .to_string(),
            "record user#3 not found"
        );
    }

    #[test]
    fn test_criterion_matches() {
        let record = DynamicRecord::new("user").with("name", "ada");

        let equals = Criterion::Equals {
            attribute: "name".into(),
            value: FieldValue::from("ada"),
        };
        assert!(equals.matches(&record));
        assert!(Criterion::IsNull {
            attribute: "age".into()
        }
        .matches(&record));
        assert!(!Criterion::IsNull {
            attribute: "name".into()
        }
        .matches(&record));
        assert_eq!(equals.attribute(), "name");
    }
}
