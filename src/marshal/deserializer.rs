//! Document → record
//!
//! One linear pass over the filtered descriptors. The first failure
//! aborts the call; assignments already made are not rolled back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::ModelSchema;
use crate::store::{Record, RecordStore};

use super::errors::{MarshalError, MarshalResult};
use super::filter::FieldFilter;
use super::Document;

/// Handling of document keys no field consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeys {
    /// Every leftover key is an error, including keys of filtered-out fields
    #[default]
    Reject,
    /// Only keys matching no field of the model are errors
    RejectUndeclared,
    /// Leftover keys are dropped
    Ignore,
}

/// Options for one deserialize or patch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializeOptions {
    pub filter: FieldFilter,
    pub unknown_keys: UnknownKeys,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self {
            filter: FieldFilter::for_deserialization(),
            unknown_keys: UnknownKeys::default(),
        }
    }
}

impl DeserializeOptions {
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn skip<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.skip(names);
        self
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.only(names);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Building a fresh record; required keys must be present
    Create,
    /// Updating a stored record; absent keys leave values untouched
    Patch,
}

pub(crate) struct Deserializer<'a> {
    schema: &'a ModelSchema,
    store: &'a dyn RecordStore,
}

impl<'a> Deserializer<'a> {
    pub(crate) fn new(schema: &'a ModelSchema, store: &'a dyn RecordStore) -> Self {
        Self { schema, store }
    }

    pub(crate) fn apply(
        &self,
        record: &mut dyn Record,
        document: &Document,
        options: &DeserializeOptions,
        mode: Mode,
    ) -> MarshalResult<()> {
        let model = self.schema.name();
        let mut remaining = document.clone();
        let exclude_identity = match mode {
            Mode::Create => None,
            Mode::Patch => record.identity(),
        };

        for field in options.filter.select(self.schema.fields()) {
            let raw = match remaining.remove(&field.json_key) {
                Some(raw) => raw,
                None => {
                    if mode == Mode::Create && field.is_required() {
                        return Err(MarshalError::MissingKey {
                            model: model.to_string(),
                            field: Box::new(field.clone()),
                        });
                    }
                    continue;
                }
            };

            let value = convert::decode_field(field, &raw, true)
                .map_err(|failure| MarshalError::from_failure(model, field, &raw, failure))?;

            // Null never collides
            if field.unique
                && !value.is_null()
                && self
                    .store
                    .exists_matching(model, field, &value, exclude_identity)?
            {
                return Err(MarshalError::NonUniqueValue {
                    model: model.to_string(),
                    json_key: field.json_key.clone(),
                    value: raw,
                });
            }

            record.assign(&field.attribute, value);
        }

        self.check_leftovers(remaining.keys(), options.unknown_keys)
    }

    fn check_leftovers<'k>(
        &self,
        keys: impl Iterator<Item = &'k String>,
        policy: UnknownKeys,
    ) -> MarshalResult<()> {
        let leftover: BTreeSet<String> = match policy {
            UnknownKeys::Reject => keys.cloned().collect(),
            UnknownKeys::RejectUndeclared => keys
                .filter(|key| self.schema.by_json_key(key).is_none())
                .cloned()
                .collect(),
            UnknownKeys::Ignore => {
                let ignored: Vec<&str> = keys.map(String::as_str).collect();
                if !ignored.is_empty() {
                    let joined = ignored.join(",");
                    log_event_with_fields(
                        Event::UnknownKeysIgnored,
                        &[("model", self.schema.name()), ("keys", joined.as_str())],
                    );
                }
                return Ok(());
            }
        };

        if leftover.is_empty() {
            Ok(())
        } else {
            Err(MarshalError::InvalidKeys {
                model: self.schema.name().to_string(),
                keys: leftover,
            })
        }
    }
}
