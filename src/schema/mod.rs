//! Schema subsystem
//!
//! Models are declared once, registered in a [`SchemaRegistry`], and
//! resolved on first use into an ordered set of [`FieldDescriptor`]s.
//!
//! # Design Principles
//!
//! - Registration is immutable: a model name is bound once
//! - Exactly one descriptor per attribute, one attribute per document key
//! - Document keys: explicit override > model key table > naming convention
//! - Resolution is memoized and never invalidated

mod descriptor;
mod errors;
mod naming;
mod registry;
mod types;

pub use descriptor::{FieldDescriptor, ModelSchema};
pub use errors::{SchemaError, SchemaResult};
pub use naming::{camel_case, snake_case, KeyConvention};
pub use registry::SchemaRegistry;
pub use types::{
    CustomConverter, DecodeFn, EncodeFn, EnumEncoding, EnumMember, EnumSpec, FieldDecl, ModelDef,
    TypeTag,
};
