//! Encode registry: native value → document value.
//!
//! Encoders are strict about the native variant they receive; a record
//! holding the wrong variant for its field is reported, not coerced.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Number, Value};

use crate::schema::{FieldDescriptor, TypeTag};

use super::value::{DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use super::{ConversionError, ConversionResult, FieldValue};

pub(crate) type EncodeHandler = fn(&FieldValue, &FieldDescriptor) -> ConversionResult<Value>;

/// Finds the handler for `tag`, walking its supertypes.
pub(crate) fn handler_for(tag: TypeTag) -> Option<EncodeHandler> {
    tag.lineage().find_map(exact_handler)
}

fn exact_handler(tag: TypeTag) -> Option<EncodeHandler> {
    let handler: EncodeHandler = match tag {
        TypeTag::Boolean => encode_bool,
        TypeTag::Integer => encode_int,
        TypeTag::Float | TypeTag::Decimal => encode_float,
        TypeTag::Date => encode_date,
        TypeTag::DateTime => encode_datetime,
        TypeTag::Time => encode_time,
        TypeTag::Blob => encode_blob,
        TypeTag::Enum => encode_enum,
        TypeTag::Reference => encode_reference,
        TypeTag::Secret => encode_secret,
        TypeTag::Uuid => encode_uuid,
        TypeTag::Ipv4 => encode_ipv4,
        TypeTag::GeneratedId | TypeTag::Plain => return None,
    };
    Some(handler)
}

fn encode_bool(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Bool(b) => Ok(Value::Bool(*b)),
        other => Err(ConversionError::native_mismatch("bool", other)),
    }
}

fn encode_int(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Int(i) => Ok(Value::from(*i)),
        other => Err(ConversionError::native_mismatch("int", other)),
    }
}

fn encode_float(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    let number = match value {
        FieldValue::Float(f) => *f,
        FieldValue::Int(i) => *i as f64,
        other => return Err(ConversionError::native_mismatch("float", other)),
    };

    Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| ConversionError::invalid("number must be finite"))
}

fn encode_date(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Date(d) => Ok(Value::String(d.format(DATE_FORMAT).to_string())),
        // A datetime stored in a date field keeps its calendar day
        FieldValue::DateTime(dt) => Ok(Value::String(dt.date().format(DATE_FORMAT).to_string())),
        other => Err(ConversionError::native_mismatch("date", other)),
    }
}

fn encode_datetime(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::DateTime(dt) => Ok(Value::String(dt.format(DATETIME_FORMAT).to_string())),
        other => Err(ConversionError::native_mismatch("datetime", other)),
    }
}

fn encode_time(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Time(t) => Ok(Value::String(t.format(TIME_FORMAT).to_string())),
        other => Err(ConversionError::native_mismatch("time", other)),
    }
}

fn encode_blob(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Blob(bytes) => Ok(Value::String(STANDARD.encode(bytes))),
        other => Err(ConversionError::native_mismatch("blob", other)),
    }
}

fn encode_enum(value: &FieldValue, field: &FieldDescriptor) -> ConversionResult<Value> {
    let spec = field
        .enum_values
        .as_ref()
        .ok_or_else(|| ConversionError::invalid("field has no enumeration"))?;

    let name = match value {
        FieldValue::Enum(name) => name,
        other => return Err(ConversionError::native_mismatch("enum", other)),
    };

    spec.by_member_name(name)
        .map(|member| Value::String(spec.literal(member).to_string()))
        .ok_or_else(|| ConversionError::InvalidEnumerationValue {
            value: name.clone(),
            allowed: spec.allowed(),
        })
}

fn encode_reference(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Reference(id) | FieldValue::Int(id) => Ok(Value::from(*id)),
        other => Err(ConversionError::native_mismatch("reference", other)),
    }
}

fn encode_secret(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Secret(hash) => Ok(Value::String(hash.as_str().to_string())),
        other => Err(ConversionError::native_mismatch("secret", other)),
    }
}

fn encode_uuid(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Uuid(id) => Ok(Value::String(id.simple().to_string())),
        other => Err(ConversionError::native_mismatch("uuid", other)),
    }
}

fn encode_ipv4(value: &FieldValue, _field: &FieldDescriptor) -> ConversionResult<Value> {
    match value {
        FieldValue::Ipv4(ip) => Ok(Value::String(ip.to_string())),
        other => Err(ConversionError::native_mismatch("ipv4", other)),
    }
}
