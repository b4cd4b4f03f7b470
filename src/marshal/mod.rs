//! Marshalling engine
//!
//! Converts between records and JSON documents, driven by the resolved
//! descriptors of the record's model.
//!
//! # Flow
//!
//! ```text
//! document ──▶ FieldFilter ──▶ decode registry ──▶ uniqueness ──▶ record
//! record   ──▶ FieldFilter ──▶ encode registry ──▶ cascade    ──▶ document
//! ```
//!
//! # Invariants
//!
//! - Fail fast: the first offending field aborts the call
//! - Serialization never rejects `null`
//! - A missing cascade target degrades to the plain identifier
//! - Cascades never nest deeper than `max_cascade_depth`

mod cascade;
mod criteria;
mod deserializer;
mod errors;
mod filter;
mod serializer;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::MarshalConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{ModelSchema, SchemaRegistry};
use crate::store::{Criterion, DynamicRecord, Record, RecordStore};

pub use cascade::Cascade;
pub use deserializer::{DeserializeOptions, UnknownKeys};
pub use errors::{MarshalError, MarshalResult};
pub use filter::FieldFilter;
pub use serializer::SerializeOptions;

use deserializer::{Deserializer, Mode};
use serializer::Serializer;

/// A JSON object exchanged at the engine boundary
pub type Document = Map<String, Value>;

/// Entry point binding a schema registry, a record store and defaults
pub struct Marshaller<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn RecordStore,
    config: MarshalConfig,
}

impl<'a> Marshaller<'a> {
    pub fn new(registry: &'a SchemaRegistry, store: &'a dyn RecordStore) -> Self {
        Self::with_config(registry, store, MarshalConfig::default())
    }

    /// Binds `config` as the source of default call options.
    ///
    /// `key_convention` and `min_secret_length` are registry settings and take
    /// effect only through [`SchemaRegistry::from_config`]; a registry that
    /// disagrees with `config` is kept as is and a warning is logged.
    pub fn with_config(
        registry: &'a SchemaRegistry,
        store: &'a dyn RecordStore,
        config: MarshalConfig,
    ) -> Self {
        if !config.agrees_with(registry) {
            log_event_with_fields(
                Event::ConfigRegistryMismatch,
                &[
                    ("config_convention", config.key_convention.as_str()),
                    ("registry_convention", registry.convention().as_str()),
                ],
            );
        }

        Self {
            registry,
            store,
            config,
        }
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Resolved descriptors of `model`
    pub fn schema_of(&self, model: &str) -> MarshalResult<Arc<ModelSchema>> {
        Ok(self.registry.descriptors_for(model)?)
    }

    /// Deserialization options seeded from the configuration
    pub fn deserialize_options(&self) -> DeserializeOptions {
        DeserializeOptions::default().with_unknown_keys(self.config.unknown_keys)
    }

    /// Serialization options seeded from the configuration
    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::default().with_nulls(self.config.include_nulls)
    }

    /// Builds a new record of `model` from `document`.
    pub fn deserialize(
        &self,
        model: &str,
        document: &Document,
        options: &DeserializeOptions,
    ) -> MarshalResult<DynamicRecord> {
        let schema = self.schema_of(model)?;
        let mut record = DynamicRecord::new(model).with_primary_key(schema.primary_key());
        Deserializer::new(&schema, self.store).apply(&mut record, document, options, Mode::Create)?;
        Ok(record)
    }

    /// Fills a caller-supplied fresh record from `document`.
    ///
    /// Required keys are enforced as for [`deserialize`](Self::deserialize).
    pub fn deserialize_into(
        &self,
        record: &mut dyn Record,
        document: &Document,
        options: &DeserializeOptions,
    ) -> MarshalResult<()> {
        let schema = self.schema_of(record.model())?;
        Deserializer::new(&schema, self.store).apply(record, document, options, Mode::Create)
    }

    /// Updates `record` in place. Absent keys leave their fields unchanged.
    pub fn patch(
        &self,
        record: &mut dyn Record,
        document: &Document,
        options: &DeserializeOptions,
    ) -> MarshalResult<()> {
        let schema = self.schema_of(record.model())?;
        Deserializer::new(&schema, self.store).apply(record, document, options, Mode::Patch)
    }

    /// Renders `record` as a document.
    pub fn serialize(
        &self,
        record: &dyn Record,
        options: &SerializeOptions,
    ) -> MarshalResult<Document> {
        Serializer::new(self.registry, self.store, self.config.max_cascade_depth)
            .serialize(record, options)
    }

    /// Equality criteria selecting records of `model` that match `document`.
    ///
    /// Every key not in `skip` must be a document key of the model.
    pub fn criteria(
        &self,
        model: &str,
        document: &Document,
        skip: &BTreeSet<String>,
    ) -> MarshalResult<Vec<Criterion>> {
        let schema = self.schema_of(model)?;
        criteria::build(&schema, document, skip)
    }
}
