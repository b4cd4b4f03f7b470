//! Map-backed record

use std::collections::BTreeMap;

use crate::convert::FieldValue;

use super::Record;

/// A record whose attributes live in an ordered map.
///
/// Used for models that have no dedicated Rust type, and by
/// [`InMemoryRecordStore`](super::InMemoryRecordStore).
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    model: String,
    primary_key: Option<String>,
    values: BTreeMap<String, FieldValue>,
}

impl DynamicRecord {
    /// Create an empty record of `model` with primary key `id`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            primary_key: Some("id".to_string()),
            values: BTreeMap::new(),
        }
    }

    /// Use `attribute` as identity, or none at all
    pub fn with_primary_key(mut self, attribute: Option<&str>) -> Self {
        self.primary_key = attribute.map(str::to_string);
        self
    }

    /// Builder-style assignment
    pub fn with(mut self, attribute: &str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(attribute.to_string(), value.into());
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&FieldValue> {
        self.values.get(attribute)
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Assigned attributes in name order
    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub(crate) fn set_identity(&mut self, identity: i64) {
        if let Some(pk) = &self.primary_key {
            self.values.insert(pk.clone(), FieldValue::Int(identity));
        }
    }
}

impl Record for DynamicRecord {
    fn model(&self) -> &str {
        &self.model
    }

    fn identity(&self) -> Option<i64> {
        self.primary_key
            .as_ref()
            .and_then(|pk| self.values.get(pk))
            .and_then(FieldValue::as_identity)
    }

    fn read(&self, attribute: &str) -> FieldValue {
        self.values
            .get(attribute)
            .cloned()
            .unwrap_or(FieldValue::Null)
    }

    fn assign(&mut self, attribute: &str, value: FieldValue) {
        self.values.insert(attribute.to_string(), value);
    }
}
