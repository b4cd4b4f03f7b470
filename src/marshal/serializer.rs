//! Record → document
//!
//! Nulls are never rejected here, only omitted unless `include_nulls` is
//! set. Relation identifiers are replaced by nested documents when the
//! cascade spec authorizes the hop and the related record exists.

use serde_json::Value;

use crate::convert;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{FieldDescriptor, SchemaRegistry};
use crate::store::{Record, RecordStore};

use super::cascade::Cascade;
use super::errors::{MarshalError, MarshalResult};
use super::filter::FieldFilter;
use super::Document;

/// Options for one serialize call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub filter: FieldFilter,
    /// Emit keys whose value is `null`
    pub include_nulls: bool,
    pub cascade: Cascade,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            filter: FieldFilter::for_serialization(),
            include_nulls: false,
            cascade: Cascade::None,
        }
    }
}

impl SerializeOptions {
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_nulls(mut self, include: bool) -> Self {
        self.include_nulls = include;
        self
    }

    pub fn with_cascade(mut self, cascade: impl Into<Cascade>) -> Self {
        self.cascade = cascade.into();
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

pub(crate) struct Serializer<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn RecordStore,
    max_depth: usize,
}

impl<'a> Serializer<'a> {
    pub(crate) fn new(
        registry: &'a SchemaRegistry,
        store: &'a dyn RecordStore,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            store,
            max_depth,
        }
    }

    pub(crate) fn serialize(
        &self,
        record: &dyn Record,
        options: &SerializeOptions,
    ) -> MarshalResult<Document> {
        self.serialize_level(
            record,
            &options.filter,
            options.include_nulls,
            &options.cascade,
            0,
        )
    }

    fn serialize_level(
        &self,
        record: &dyn Record,
        filter: &FieldFilter,
        include_nulls: bool,
        cascade: &Cascade,
        depth: usize,
    ) -> MarshalResult<Document> {
        let schema = self.registry.descriptors_for(record.model())?;
        let mut document = Document::new();

        for field in filter.select(schema.fields()) {
            let native = record.read(&field.attribute);
            let mut value = convert::encode_field(field, &native, false).map_err(|failure| {
                MarshalError::from_failure(schema.name(), field, &native.to_json(), failure)
            })?;

            if field.is_relation() {
                if let (Some(identity), Some(next)) = (native.as_identity(), cascade.step(field)) {
                    if let Some(nested) =
                        self.follow(field, identity, &next, include_nulls, depth)?
                    {
                        value = Value::Object(nested);
                    }
                }
            }

            if value.is_null() && !include_nulls {
                continue;
            }
            document.insert(field.json_key.clone(), value);
        }

        Ok(document)
    }

    /// Serializes the record behind a relation, or `None` to keep the
    /// plain identifier.
    fn follow(
        &self,
        field: &FieldDescriptor,
        identity: i64,
        next: &Cascade,
        include_nulls: bool,
        depth: usize,
    ) -> MarshalResult<Option<Document>> {
        let target = match &field.relation_target {
            Some(target) => target.as_str(),
            None => return Ok(None),
        };
        let id = identity.to_string();

        if depth >= self.max_depth {
            log_event_with_fields(
                Event::CascadeDepthLimit,
                &[("model", target), ("id", id.as_str()), ("key", field.json_key.as_str())],
            );
            return Ok(None);
        }

        match self.store.fetch_by_identity(target, identity)? {
            Some(related) => self
                .serialize_level(
                    related.as_ref(),
                    &FieldFilter::for_serialization(),
                    include_nulls,
                    next,
                    depth + 1,
                )
                .map(Some),
            None => {
                log_event_with_fields(
                    Event::CascadeTargetMissing,
                    &[("model", target), ("id", id.as_str())],
                );
                Ok(None)
            }
        }
    }
}
