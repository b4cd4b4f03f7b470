//! recordjson - schema-driven JSON marshalling for typed records
//!
//! Models are registered once in a [`SchemaRegistry`]; a [`Marshaller`]
//! then converts records to and from JSON documents, enforcing
//! nullability, uniqueness, enumerations, key naming, projection and
//! relation cascading.

pub mod config;
pub mod convert;
pub mod marshal;
pub mod observability;
pub mod schema;
pub mod store;

pub use config::{ConfigError, MarshalConfig};
pub use convert::{ConversionError, FieldValue, SecretHash};
pub use marshal::{
    Cascade, DeserializeOptions, Document, FieldFilter, MarshalError, MarshalResult, Marshaller,
    SerializeOptions, UnknownKeys,
};
pub use schema::{
    EnumSpec, FieldDecl, FieldDescriptor, KeyConvention, ModelDef, ModelSchema, SchemaError,
    SchemaRegistry, TypeTag,
};
pub use store::{
    Criterion, DynamicRecord, InMemoryRecordStore, Record, RecordStore, StoreError, StoreResult,
};
