//! Field converter registries
//!
//! Two independent registries map a field's [`TypeTag`] to a pure
//! conversion function: the decode registry (document → native) and the
//! encode registry (native → document).
//!
//! Lookup order for one field:
//!
//! 1. `null` is answered before any handler runs
//! 2. the descriptor's [`CustomConverter`](crate::schema::CustomConverter), if any
//! 3. the handler of the tag, then of each supertype in its lineage
//! 4. the identity mapping
//!
//! Handlers report bare [`ConversionError`]s; the marshal layer attaches
//! model and field context.

mod decode;
mod encode;
mod secret;
mod value;

use serde_json::Value;
use thiserror::Error;

use crate::schema::FieldDescriptor;

pub use decode::parse_decimal_text;
pub use secret::SecretHash;
pub use value::FieldValue;

/// Result type for a single conversion
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Why a single value could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The value has the wrong JSON or native shape
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The value has the right shape but is not acceptable
    #[error("{0}")]
    InvalidValue(String),

    /// The value is not a member of the field's enumeration
    #[error("invalid enumeration value \"{value}\"")]
    InvalidEnumerationValue { value: String, allowed: Vec<String> },

    /// Secret plaintext shorter than the field minimum
    #[error("password too short ({actual_length} / {minimum_length} characters)")]
    PasswordTooShort {
        actual_length: usize,
        minimum_length: usize,
    },
}

impl ConversionError {
    pub(crate) fn mismatch(expected: &'static str, actual: &Value) -> Self {
        ConversionError::TypeMismatch {
            expected,
            actual: json_type_name(actual),
        }
    }

    pub(crate) fn native_mismatch(expected: &'static str, actual: &FieldValue) -> Self {
        ConversionError::TypeMismatch {
            expected,
            actual: actual.kind(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ConversionError::InvalidValue(reason.into())
    }
}

/// Outcome of a failed field conversion.
///
/// `Null` only signals "null where the field forbids it" and is always
/// translated into a field-level error before leaving the crate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConvertFailure {
    Null,
    Conversion(ConversionError),
}

impl From<ConversionError> for ConvertFailure {
    fn from(err: ConversionError) -> Self {
        ConvertFailure::Conversion(err)
    }
}

/// Decodes a document value for `field`.
pub(crate) fn decode_field(
    field: &FieldDescriptor,
    value: &Value,
    check_null: bool,
) -> Result<FieldValue, ConvertFailure> {
    if value.is_null() {
        if check_null && !field.nullable {
            return Err(ConvertFailure::Null);
        }
        return Ok(FieldValue::Null);
    }

    if let Some(custom) = &field.converter {
        return (custom.decode)(value, field).map_err(ConvertFailure::from);
    }

    match decode::handler_for(field.type_tag) {
        Some(handler) => handler(value, field).map_err(ConvertFailure::from),
        None => Ok(FieldValue::from_json(value)),
    }
}

/// Encodes a native value of `field` for a document.
pub(crate) fn encode_field(
    field: &FieldDescriptor,
    value: &FieldValue,
    check_null: bool,
) -> Result<Value, ConvertFailure> {
    if value.is_null() {
        if check_null && !field.nullable {
            return Err(ConvertFailure::Null);
        }
        return Ok(Value::Null);
    }

    if let Some(custom) = &field.converter {
        return (custom.encode)(value, field).map_err(ConvertFailure::from);
    }

    match encode::handler_for(field.type_tag) {
        Some(handler) => handler(value, field).map_err(ConvertFailure::from),
        None => Ok(value.to_json()),
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CustomConverter, FieldDecl, TypeTag};
    use serde_json::json;

    fn descriptor(decl: FieldDecl) -> FieldDescriptor {
        let key = decl.attribute.clone();
        FieldDescriptor::from_decl(decl, key)
    }

    #[test]
    fn test_null_rejected_only_when_checked() {
        let field = descriptor(FieldDecl::new("age", TypeTag::Integer));
        assert_eq!(decode_field(&field, &Value::Null, true), Err(ConvertFailure::Null));
        assert_eq!(decode_field(&field, &Value::Null, false), Ok(FieldValue::Null));
        assert_eq!(encode_field(&field, &FieldValue::Null, false), Ok(Value::Null));
    }

    #[test]
    fn test_nullable_field_accepts_null() {
        let field = descriptor(FieldDecl::new("age", TypeTag::Integer).with_null());
        assert_eq!(decode_field(&field, &Value::Null, true), Ok(FieldValue::Null));
    }

    #[test]
    fn test_plain_passes_through() {
        let field = descriptor(FieldDecl::plain("meta"));
        let value = json!({"nested": [1, 2]});
        let decoded = decode_field(&field, &value, true).unwrap();
        assert_eq!(decoded, FieldValue::Json(value.clone()));
        assert_eq!(encode_field(&field, &decoded, false).unwrap(), value);
    }

    #[test]
    fn test_generated_id_falls_back_to_integer() {
        let field = descriptor(FieldDecl::generated_id("id"));
        assert_eq!(decode_field(&field, &json!("12"), true), Ok(FieldValue::Int(12)));
        assert!(decode_field(&field, &json!("abc"), true).is_err());
    }

    fn decode_upper(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
        value
            .as_str()
            .map(|s| FieldValue::Text(s.to_uppercase()))
            .ok_or_else(|| ConversionError::mismatch("string", value))
    }

    fn encode_lower(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
        match value {
            FieldValue::Text(s) => Ok(Value::String(s.to_lowercase())),
            other => Err(ConversionError::native_mismatch("text", other)),
        }
    }

    #[test]
    fn test_custom_converter_takes_precedence() {
        let converter = CustomConverter {
            name: "shout",
            decode: decode_upper,
            encode: encode_lower,
        };
        let field = descriptor(FieldDecl::new("code", TypeTag::Integer).with_converter(converter));

        assert_eq!(
            decode_field(&field, &json!("abc"), true),
            Ok(FieldValue::Text("ABC".into()))
        );
        assert_eq!(
            encode_field(&field, &FieldValue::Text("ABC".into()), false),
            Ok(json!("abc"))
        );
    }
}
