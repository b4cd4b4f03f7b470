//! Decode registry: document value → native value.

use std::net::Ipv4Addr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{FieldDescriptor, TypeTag};

use super::secret::SecretHash;
use super::value::{DATE_FORMAT, TIME_FORMAT};
use super::{ConversionError, ConversionResult, FieldValue};

pub(crate) type DecodeHandler = fn(&Value, &FieldDescriptor) -> ConversionResult<FieldValue>;

/// Finds the handler for `tag`, walking its supertypes.
pub(crate) fn handler_for(tag: TypeTag) -> Option<DecodeHandler> {
    tag.lineage().find_map(exact_handler)
}

fn exact_handler(tag: TypeTag) -> Option<DecodeHandler> {
    let handler: DecodeHandler = match tag {
        TypeTag::Boolean => decode_bool,
        TypeTag::Integer => decode_int,
        TypeTag::Float => decode_float,
        TypeTag::Decimal => decode_decimal,
        TypeTag::Date => decode_date,
        TypeTag::DateTime => decode_datetime,
        TypeTag::Time => decode_time,
        TypeTag::Blob => decode_blob,
        TypeTag::Enum => decode_enum,
        TypeTag::Reference => decode_reference,
        TypeTag::Secret => decode_secret,
        TypeTag::Uuid => decode_uuid,
        TypeTag::Ipv4 => decode_ipv4,
        TypeTag::GeneratedId | TypeTag::Plain => return None,
    };
    Some(handler)
}

fn decode_bool(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    match value {
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(FieldValue::Bool(false)),
            Some(1) => Ok(FieldValue::Bool(true)),
            _ => Err(ConversionError::invalid(format!("{} is not a boolean", n))),
        },
        other => Err(ConversionError::mismatch("boolean", other)),
    }
}

fn decode_int(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    parse_integer(value).map(FieldValue::Int)
}

fn decode_float(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ConversionError::invalid(format!("{} is not a float", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::invalid(format!("\"{}\" is not a float", s)))?,
        other => return Err(ConversionError::mismatch("float", other)),
    };
    finite(number).map(FieldValue::Float)
}

fn decode_decimal(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ConversionError::invalid(format!("{} is not a decimal", n)))?,
        Value::String(s) => parse_decimal_text(s)
            .ok_or_else(|| ConversionError::invalid(format!("\"{}\" is not a decimal", s)))?,
        other => return Err(ConversionError::mismatch("decimal", other)),
    };
    finite(number).map(FieldValue::Float)
}

fn decode_date(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let text = expect_str(value, "date")?;
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(FieldValue::Date)
        .map_err(|e| ConversionError::invalid(format!("\"{}\" is not an ISO date: {}", text, e)))
}

fn decode_datetime(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let text = expect_str(value, "datetime")?;

    if let Ok(dt) = text.parse::<NaiveDateTime>() {
        return Ok(FieldValue::DateTime(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(FieldValue::DateTime(dt));
    }
    // Offsets are normalized to UTC
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(FieldValue::DateTime(dt.naive_utc()));
    }

    Err(ConversionError::invalid(format!("\"{}\" is not an ISO datetime", text)))
}

fn decode_time(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let text = expect_str(value, "time")?;

    if let Ok(t) = NaiveTime::parse_from_str(text, TIME_FORMAT) {
        return Ok(FieldValue::Time(t));
    }
    NaiveTime::parse_from_str(text, "%H:%M")
        .map(FieldValue::Time)
        .map_err(|_| ConversionError::invalid(format!("\"{}\" is not an ISO time", text)))
}

fn decode_blob(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    match value {
        Value::String(s) => STANDARD
            .decode(s)
            .map(FieldValue::Blob)
            .map_err(|e| ConversionError::invalid(format!("invalid base64: {}", e))),
        // Raw bytes arrive as an array of octets
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| ConversionError::invalid("byte array items must be 0-255"))
            })
            .collect::<ConversionResult<Vec<u8>>>()
            .map(FieldValue::Blob),
        other => Err(ConversionError::mismatch("base64 string", other)),
    }
}

fn decode_enum(value: &Value, field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let spec = field
        .enum_values
        .as_ref()
        .ok_or_else(|| ConversionError::invalid("field has no enumeration"))?;
    // Numeric literals match by their decimal text
    let literal = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(ConversionError::mismatch("enum literal", other)),
    };

    spec.by_literal(&literal)
        .map(|member| FieldValue::Enum(member.name.clone()))
        .ok_or_else(|| ConversionError::InvalidEnumerationValue {
            value: literal,
            allowed: spec.allowed(),
        })
}

fn decode_reference(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    parse_integer(value).map(FieldValue::Reference)
}

fn decode_secret(value: &Value, field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    // Document text is always plaintext, even when it looks like a hash
    let text = expect_str(value, "password")?;
    let min_length = field.min_length.unwrap_or(SecretHash::DEFAULT_MIN_LENGTH);
    SecretHash::create(text, min_length).map(FieldValue::Secret)
}

fn decode_uuid(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let text = expect_str(value, "uuid")?;
    Uuid::parse_str(text)
        .map(FieldValue::Uuid)
        .map_err(|e| ConversionError::invalid(format!("\"{}\" is not a UUID: {}", text, e)))
}

fn decode_ipv4(value: &Value, _field: &FieldDescriptor) -> ConversionResult<FieldValue> {
    let text = expect_str(value, "ipv4 address")?;
    text.parse::<Ipv4Addr>()
        .map(FieldValue::Ipv4)
        .map_err(|_| ConversionError::invalid(format!("\"{}\" is not an IPv4 address", text)))
}

fn expect_str<'a>(value: &'a Value, expected: &'static str) -> ConversionResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ConversionError::mismatch(expected, value))
}

/// Integers, integral floats and numeric strings; booleans are rejected.
fn parse_integer(value: &Value) -> ConversionResult<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(ConversionError::invalid(format!("{} is not an integer", n))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConversionError::invalid(format!("\"{}\" is not an integer", s))),
        other => Err(ConversionError::mismatch("integer", other)),
    }
}

fn finite(number: f64) -> ConversionResult<f64> {
    if number.is_finite() {
        Ok(number)
    } else {
        Err(ConversionError::invalid("number must be finite"))
    }
}

/// Parses a decimal written with comma or dot separators (or both).
///
/// The later separator is the decimal mark when both appear; a separator
/// repeated more than once is a thousands separator.
pub fn parse_decimal_text(text: &str) -> Option<f64> {
    let text = text.trim();

    let normalized = match (text.find(','), text.find('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                text.replace('.', "").replace(',', ".")
            } else {
                text.replace(',', "")
            }
        }
        (Some(_), None) => {
            if text.matches(',').count() > 1 {
                text.replace(',', "")
            } else {
                text.replace(',', ".")
            }
        }
        (None, _) => {
            if text.matches('.').count() > 1 {
                text.replace('.', "")
            } else {
                text.to_string()
            }
        }
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSpec, FieldDecl};
    use serde_json::json;

    fn field(decl: FieldDecl) -> FieldDescriptor {
        let key = decl.attribute.clone();
        FieldDescriptor::from_decl(decl, key)
    }

    fn decode(tag: TypeTag, value: Value) -> ConversionResult<FieldValue> {
        let descriptor = field(FieldDecl::new("f", tag));
        handler_for(tag).unwrap()(&value, &descriptor)
    }

    #[test]
    fn test_bool() {
        assert_eq!(decode(TypeTag::Boolean, json!(true)), Ok(FieldValue::Bool(true)));
        assert_eq!(decode(TypeTag::Boolean, json!(0)), Ok(FieldValue::Bool(false)));
        assert_eq!(decode(TypeTag::Boolean, json!(1)), Ok(FieldValue::Bool(true)));
        assert!(decode(TypeTag::Boolean, json!(2)).is_err());
        assert!(matches!(
            decode(TypeTag::Boolean, json!("yes")),
            Err(ConversionError::TypeMismatch { expected: "boolean", actual: "string" })
        ));
    }

    #[test]
    fn test_int() {
        assert_eq!(decode(TypeTag::Integer, json!(7)), Ok(FieldValue::Int(7)));
        assert_eq!(decode(TypeTag::Integer, json!(7.0)), Ok(FieldValue::Int(7)));
        assert_eq!(decode(TypeTag::Integer, json!(" -3 ")), Ok(FieldValue::Int(-3)));
        assert!(decode(TypeTag::Integer, json!(7.5)).is_err());
        assert!(decode(TypeTag::Integer, json!(true)).is_err());
    }

    #[test]
    fn test_float_and_decimal() {
        assert_eq!(decode(TypeTag::Float, json!(2)), Ok(FieldValue::Float(2.0)));
        assert_eq!(decode(TypeTag::Float, json!("2.5")), Ok(FieldValue::Float(2.5)));
        assert_eq!(decode(TypeTag::Decimal, json!("1.234,5")), Ok(FieldValue::Float(1234.5)));
        assert!(decode(TypeTag::Float, json!("NaN")).is_err());
        assert!(decode(TypeTag::Decimal, json!([1])).is_err());
    }

    #[test]
    fn test_parse_decimal_text() {
        assert_eq!(parse_decimal_text("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal_text("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal_text("1,5"), Some(1.5));
        assert_eq!(parse_decimal_text("1,234,567"), Some(1234567.0));
        assert_eq!(parse_decimal_text("1.234.567"), Some(1234567.0));
        assert_eq!(parse_decimal_text("3.25"), Some(3.25));
        assert_eq!(parse_decimal_text("abc"), None);
        assert_eq!(parse_decimal_text("inf"), None);
    }

    #[test]
    fn test_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(decode(TypeTag::Date, json!("2024-02-29")), Ok(FieldValue::Date(date)));
        assert!(decode(TypeTag::Date, json!("2023-02-29")).is_err());

        let dt = date.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(
            decode(TypeTag::DateTime, json!("2024-02-29T13:05:09")),
            Ok(FieldValue::DateTime(dt))
        );
        assert_eq!(
            decode(TypeTag::DateTime, json!("2024-02-29 13:05:09")),
            Ok(FieldValue::DateTime(dt))
        );
        assert_eq!(
            decode(TypeTag::DateTime, json!("2024-02-29T15:05:09+02:00")),
            Ok(FieldValue::DateTime(dt))
        );

        let time = NaiveTime::from_hms_opt(13, 5, 0).unwrap();
        assert_eq!(decode(TypeTag::Time, json!("13:05:00")), Ok(FieldValue::Time(time)));
        assert_eq!(decode(TypeTag::Time, json!("13:05")), Ok(FieldValue::Time(time)));
        assert!(decode(TypeTag::Time, json!(1305)).is_err());
    }

    #[test]
    fn test_blob() {
        assert_eq!(decode(TypeTag::Blob, json!("aGk=")), Ok(FieldValue::Blob(b"hi".to_vec())));
        assert_eq!(decode(TypeTag::Blob, json!([104, 105])), Ok(FieldValue::Blob(b"hi".to_vec())));
        assert!(decode(TypeTag::Blob, json!("***")).is_err());
        assert!(decode(TypeTag::Blob, json!([256])).is_err());
    }

    #[test]
    fn test_enum() {
        let descriptor = field(FieldDecl::enumeration(
            "role",
            EnumSpec::from_pairs([("ADMIN", "a"), ("GUEST", "g")]),
        ));
        assert_eq!(
            decode_enum(&json!("a"), &descriptor),
            Ok(FieldValue::Enum("ADMIN".into()))
        );
        assert_eq!(
            decode_enum(&json!("x"), &descriptor),
            Err(ConversionError::InvalidEnumerationValue {
                value: "x".into(),
                allowed: vec!["a".into(), "g".into()],
            })
        );
    }

    #[test]
    fn test_enum_numeric_literal() {
        let descriptor = field(FieldDecl::enumeration(
            "priority",
            EnumSpec::from_pairs([("LOW", "1"), ("HIGH", "2")]),
        ));
        assert_eq!(
            decode_enum(&json!(2), &descriptor),
            Ok(FieldValue::Enum("HIGH".into()))
        );
        assert_eq!(
            decode_enum(&json!("1"), &descriptor),
            Ok(FieldValue::Enum("LOW".into()))
        );
        assert_eq!(
            decode_enum(&json!(3), &descriptor),
            Err(ConversionError::InvalidEnumerationValue {
                value: "3".into(),
                allowed: vec!["1".into(), "2".into()],
            })
        );
        assert!(decode_enum(&json!(true), &descriptor).is_err());
    }

    #[test]
    fn test_reference_uuid_ipv4() {
        assert_eq!(decode(TypeTag::Reference, json!(5)), Ok(FieldValue::Reference(5)));
        assert_eq!(decode(TypeTag::Reference, json!("5")), Ok(FieldValue::Reference(5)));

        let id = Uuid::new_v4();
        assert_eq!(
            decode(TypeTag::Uuid, json!(id.simple().to_string())),
            Ok(FieldValue::Uuid(id))
        );
        assert_eq!(decode(TypeTag::Uuid, json!(id.to_string())), Ok(FieldValue::Uuid(id)));

        assert_eq!(
            decode(TypeTag::Ipv4, json!("10.0.0.1")),
            Ok(FieldValue::Ipv4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert!(decode(TypeTag::Ipv4, json!("10.0.0.256")).is_err());
    }

    #[test]
    fn test_secret() {
        let descriptor = field(FieldDecl::secret("password").with_min_length(6));

        match decode_secret(&json!("hunter22"), &descriptor) {
            Ok(FieldValue::Secret(hash)) => {
                assert!(hash.verify("hunter22"));
                // Hash text is hashed again as plaintext
                match decode_secret(&json!(hash.as_str()), &descriptor) {
                    Ok(FieldValue::Secret(again)) => {
                        assert_ne!(again, hash);
                        assert!(again.verify(hash.as_str()));
                    }
                    other => panic!("unexpected: {:?}", other),
                }
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(
            decode_secret(&json!("abc"), &descriptor),
            Err(ConversionError::PasswordTooShort {
                actual_length: 3,
                minimum_length: 6
            })
        );
    }

    #[test]
    fn test_secret_prehashed_weak_password_not_trusted() {
        let descriptor = field(FieldDecl::secret("password"));
        let weak = SecretHash::create("a", 0).unwrap();

        match decode_secret(&json!(weak.as_str()), &descriptor) {
            Ok(FieldValue::Secret(stored)) => {
                assert!(!stored.verify("a"));
                assert!(stored.verify(weak.as_str()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plain_and_generated_have_no_exact_handler() {
        assert!(exact_handler(TypeTag::Plain).is_none());
        assert!(exact_handler(TypeTag::GeneratedId).is_none());
        assert!(handler_for(TypeTag::GeneratedId).is_some());
        assert!(handler_for(TypeTag::Plain).is_none());
    }
}
