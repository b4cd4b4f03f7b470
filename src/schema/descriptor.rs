//! Resolved field descriptors
//!
//! Descriptors are computed once per model by the registry and are
//! read-only afterwards.

use super::types::{CustomConverter, EnumSpec, FieldDecl, TypeTag};

/// Immutable description of one field of a resolved model
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Identifier used to read and write the record
    pub attribute: String,
    /// Storage column name
    pub column_name: String,
    /// External document key, unique within the model
    pub json_key: String,
    pub type_tag: TypeTag,
    pub nullable: bool,
    pub has_default: bool,
    pub unique: bool,
    pub enum_values: Option<EnumSpec>,
    pub relation_target: Option<String>,
    pub min_length: Option<usize>,
    pub converter: Option<CustomConverter>,
}

impl FieldDescriptor {
    pub(crate) fn from_decl(decl: FieldDecl, json_key: String) -> Self {
        let column_name = decl.column();
        Self {
            attribute: decl.attribute,
            column_name,
            json_key,
            type_tag: decl.type_tag,
            nullable: decl.nullable,
            has_default: decl.has_default,
            unique: decl.unique,
            enum_values: decl.enum_values,
            relation_target: decl.relation_target,
            min_length: decl.min_length,
            converter: decl.converter,
        }
    }

    /// Whether omitting the key on creation is an error
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.has_default
    }

    /// Whether `name` is this field's document key or attribute
    pub fn matches(&self, name: &str) -> bool {
        self.json_key == name || self.attribute == name
    }

    pub fn is_relation(&self) -> bool {
        self.type_tag == TypeTag::Reference
    }

    pub fn is_generated(&self) -> bool {
        self.type_tag == TypeTag::GeneratedId
    }

    pub fn is_secret(&self) -> bool {
        self.type_tag == TypeTag::Secret
    }
}

/// Ordered, deduplicated descriptor set of one model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl ModelSchema {
    pub(crate) fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptors in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks a field up by document key or attribute
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_json_key(name).or_else(|| self.by_attribute(name))
    }

    pub fn by_json_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.json_key == key)
    }

    pub fn by_attribute(&self, attribute: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.attribute == attribute)
    }

    /// Attribute of the first generated identity field
    pub fn primary_key(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.is_generated())
            .map(|f| f.attribute.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
