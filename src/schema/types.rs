//! Schema declaration types
//!
//! A model is declared as an ordered list of [`FieldDecl`]s plus an optional
//! parent and key table. Declarations are plain data and round-trip through
//! JSON, so models can live in files next to the application.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::convert::{ConversionResult, FieldValue};

use super::descriptor::FieldDescriptor;

/// Conversion family of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Time,
    Blob,
    Enum,
    /// Foreign key to another model's generated identity
    Reference,
    /// Surrogate identity assigned by the store
    GeneratedId,
    /// Password hash; never serialized by default
    Secret,
    Uuid,
    Ipv4,
    /// JSON-native value passed through unchanged
    Plain,
}

impl TypeTag {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Decimal => "decimal",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
            TypeTag::Time => "time",
            TypeTag::Blob => "blob",
            TypeTag::Enum => "enum",
            TypeTag::Reference => "reference",
            TypeTag::GeneratedId => "generated_id",
            TypeTag::Secret => "secret",
            TypeTag::Uuid => "uuid",
            TypeTag::Ipv4 => "ipv4",
            TypeTag::Plain => "plain",
        }
    }

    /// The family this tag falls back to when no converter handles it exactly
    pub fn parent(&self) -> Option<TypeTag> {
        match self {
            TypeTag::GeneratedId => Some(TypeTag::Integer),
            TypeTag::Secret => Some(TypeTag::Plain),
            _ => None,
        }
    }

    /// This tag followed by its supertypes, most specific first
    pub fn lineage(self) -> impl Iterator<Item = TypeTag> {
        std::iter::successors(Some(self), TypeTag::parent)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// One member of a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Symbolic name; this is what records hold
    pub name: String,
    /// Stored literal
    pub value: String,
}

/// Which representation of an enum member appears in documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumEncoding {
    #[default]
    Value,
    Name,
}

/// Closed value set of an enum field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSpec {
    pub members: Vec<EnumMember>,
    #[serde(default)]
    pub encoding: EnumEncoding,
}

impl EnumSpec {
    /// Builds a spec whose member names equal their literals
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = values
            .into_iter()
            .map(|value| {
                let value = value.into();
                EnumMember {
                    name: value.clone(),
                    value,
                }
            })
            .collect();

        Self {
            members,
            encoding: EnumEncoding::Value,
        }
    }

    /// Builds a spec from `(name, value)` pairs
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let members = pairs
            .into_iter()
            .map(|(name, value)| EnumMember {
                name: name.into(),
                value: value.into(),
            })
            .collect();

        Self {
            members,
            encoding: EnumEncoding::Value,
        }
    }

    /// Switches the document representation to member names
    pub fn by_name(mut self) -> Self {
        self.encoding = EnumEncoding::Name;
        self
    }

    /// Returns the document literal of a member
    pub fn literal<'a>(&self, member: &'a EnumMember) -> &'a str {
        match self.encoding {
            EnumEncoding::Value => &member.value,
            EnumEncoding::Name => &member.name,
        }
    }

    /// Finds the member whose document literal is `literal`
    pub fn by_literal(&self, literal: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| self.literal(m) == literal)
    }

    /// Finds a member by symbolic name
    pub fn by_member_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// All accepted document literals, in declaration order
    pub fn allowed(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| self.literal(m).to_string())
            .collect()
    }
}

/// Decode half of a [`CustomConverter`]
pub type DecodeFn = fn(&Value, &FieldDescriptor) -> ConversionResult<FieldValue>;

/// Encode half of a [`CustomConverter`]
pub type EncodeFn = fn(&FieldValue, &FieldDescriptor) -> ConversionResult<Value>;

/// Explicit converter pair that replaces the registry lookup for one field
#[derive(Clone, Copy)]
pub struct CustomConverter {
    /// Identifies the pair; two converters are equal when names match
    pub name: &'static str,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl fmt::Debug for CustomConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConverter")
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for CustomConverter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A field as declared by the schema provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Identifier used to read and write the record
    pub attribute: String,
    /// Storage column; defaults to the attribute (`<attribute>_id` for relations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub unique: bool,
    /// Explicit document key; beats the model key table and the convention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<EnumSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_target: Option<String>,
    /// Minimum plaintext length for secret fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip)]
    pub converter: Option<CustomConverter>,
}

impl FieldDecl {
    /// Create a required, non-unique field of the given family
    pub fn new(attribute: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            attribute: attribute.into(),
            column_name: None,
            type_tag,
            nullable: false,
            has_default: false,
            unique: false,
            json_key: None,
            enum_values: None,
            relation_target: None,
            min_length: None,
            converter: None,
        }
    }

    /// Create a plain (pass-through) field
    pub fn plain(attribute: impl Into<String>) -> Self {
        Self::new(attribute, TypeTag::Plain)
    }

    /// Create a store-assigned identity field
    pub fn generated_id(attribute: impl Into<String>) -> Self {
        Self::new(attribute, TypeTag::GeneratedId).with_default()
    }

    /// Create an enum field
    pub fn enumeration(attribute: impl Into<String>, spec: EnumSpec) -> Self {
        let mut decl = Self::new(attribute, TypeTag::Enum);
        decl.enum_values = Some(spec);
        decl
    }

    /// Create a relation to `target`
    pub fn relation(attribute: impl Into<String>, target: impl Into<String>) -> Self {
        let mut decl = Self::new(attribute, TypeTag::Reference);
        decl.relation_target = Some(target.into());
        decl
    }

    /// Create a secret (password hash) field
    pub fn secret(attribute: impl Into<String>) -> Self {
        Self::new(attribute, TypeTag::Secret)
    }

    /// Accept `null`
    pub fn with_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allow omission on creation
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Reject values another record already holds
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_json_key(mut self, key: impl Into<String>) -> Self {
        self.json_key = Some(key.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_converter(mut self, converter: CustomConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Storage column, applying the default when none is declared
    pub fn column(&self) -> String {
        match &self.column_name {
            Some(column) => column.clone(),
            None if self.type_tag == TypeTag::Reference => format!("{}_id", self.attribute),
            None => self.attribute.clone(),
        }
    }
}

/// Complete model declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Unique model name
    pub name: String,
    /// Model whose fields and key table this one inherits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Declared fields, in document order
    pub fields: Vec<FieldDecl>,
    /// Attribute to document key overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub json_keys: BTreeMap<String, String>,
}

impl ModelDef {
    /// Create a new model definition
    pub fn new(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields,
            json_keys: BTreeMap::new(),
        }
    }

    /// Inherit from `parent`
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add key table entries, replacing earlier ones for the same attribute
    pub fn with_json_keys<I, A, K>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (A, K)>,
        A: Into<String>,
        K: Into<String>,
    {
        self.json_keys
            .extend(table.into_iter().map(|(a, k)| (a.into(), k.into())));
        self
    }

    /// Validates the definition on its own, without its parent chain
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("model name must not be empty".into());
        }

        let mut attributes = BTreeSet::new();
        for field in &self.fields {
            if field.attribute.is_empty() {
                return Err("field attribute must not be empty".into());
            }

            if !attributes.insert(field.attribute.as_str()) {
                return Err(format!("attribute '{}' declared twice", field.attribute));
            }

            match (field.type_tag, &field.enum_values) {
                (TypeTag::Enum, None) => {
                    return Err(format!("enum field '{}' has no members", field.attribute));
                }
                (TypeTag::Enum, Some(spec)) if spec.members.is_empty() => {
                    return Err(format!("enum field '{}' has no members", field.attribute));
                }
                (TypeTag::Enum, _) | (_, None) => {}
                (_, Some(_)) => {
                    return Err(format!(
                        "field '{}' is not an enum but declares enum values",
                        field.attribute
                    ));
                }
            }

            if field.type_tag == TypeTag::Reference && field.relation_target.is_none() {
                return Err(format!("relation '{}' has no target model", field.attribute));
            }
        }

        let mut keys = BTreeSet::new();
        for key in self.json_keys.values() {
            if !keys.insert(key.as_str()) {
                return Err(format!("duplicate JSON key '{}' in key table", key));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> ModelDef {
        ModelDef::new(
            "user",
            vec![
                FieldDecl::generated_id("id"),
                FieldDecl::plain("name"),
                FieldDecl::new("age", TypeTag::Integer).with_null(),
                FieldDecl::relation("company", "company").with_null(),
            ],
        )
    }

    #[test]
    fn test_model_structure_valid() {
        assert!(sample_model().validate_structure().is_ok());
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut model = sample_model();
        model.fields.push(FieldDecl::plain("name"));
        let result = model.validate_structure();
        assert!(result.unwrap_err().contains("twice"));
    }

    #[test]
    fn test_enum_without_members_rejected() {
        let model = ModelDef::new(
            "user",
            vec![FieldDecl::enumeration("role", EnumSpec::from_values(Vec::<String>::new()))],
        );
        assert!(model.validate_structure().is_err());
    }

    #[test]
    fn test_enum_values_on_plain_field_rejected() {
        let mut field = FieldDecl::plain("role");
        field.enum_values = Some(EnumSpec::from_values(["A"]));
        let model = ModelDef::new("user", vec![field]);
        assert!(model.validate_structure().is_err());
    }

    #[test]
    fn test_relation_without_target_rejected() {
        let model = ModelDef::new("user", vec![FieldDecl::new("company", TypeTag::Reference)]);
        assert!(model.validate_structure().unwrap_err().contains("target"));
    }

    #[test]
    fn test_duplicate_key_table_entry_rejected() {
        let model = sample_model().with_json_keys([("name", "label"), ("age", "label")]);
        assert!(model.validate_structure().unwrap_err().contains("label"));
    }

    #[test]
    fn test_relation_column_defaults_to_id_suffix() {
        assert_eq!(FieldDecl::relation("company", "company").column(), "company_id");
        assert_eq!(FieldDecl::plain("name").column(), "name");
        assert_eq!(FieldDecl::plain("name").with_column("full_name").column(), "full_name");
    }

    #[test]
    fn test_type_lineage() {
        let lineage: Vec<_> = TypeTag::GeneratedId.lineage().collect();
        assert_eq!(lineage, vec![TypeTag::GeneratedId, TypeTag::Integer]);

        let lineage: Vec<_> = TypeTag::Secret.lineage().collect();
        assert_eq!(lineage, vec![TypeTag::Secret, TypeTag::Plain]);

        assert_eq!(TypeTag::Date.lineage().count(), 1);
    }

    #[test]
    fn test_enum_spec_encoding() {
        let spec = EnumSpec::from_pairs([("ADMIN", "a"), ("GUEST", "g")]);
        assert_eq!(spec.by_literal("a").unwrap().name, "ADMIN");
        assert!(spec.by_literal("ADMIN").is_none());
        assert_eq!(spec.allowed(), vec!["a", "g"]);

        let spec = spec.by_name();
        assert_eq!(spec.by_literal("ADMIN").unwrap().value, "a");
        assert_eq!(spec.allowed(), vec!["ADMIN", "GUEST"]);
    }

    #[test]
    fn test_model_def_json_roundtrip() {
        let model = sample_model().with_json_keys([("name", "fullName")]);
        let text = serde_json::to_string(&model).unwrap();
        let parsed: ModelDef = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_model_def_parses_tag_names() {
        let parsed: ModelDef = serde_json::from_value(serde_json::json!({
            "name": "event",
            "fields": [
                {"attribute": "at", "type": "datetime"},
                {"attribute": "owner", "type": "reference", "relation_target": "user"}
            ]
        }))
        .unwrap();

        assert_eq!(parsed.fields[0].type_tag, TypeTag::DateTime);
        assert_eq!(parsed.fields[1].relation_target.as_deref(), Some("user"));
        assert!(!parsed.fields[0].nullable);
    }
}
