//! Document → selection criteria
//!
//! Builds an equality query from a document keyed like the model's
//! serialized form. Values are decoded without the null check; `null`
//! selects records where the field is unset.

use std::collections::BTreeSet;

use crate::convert::{self, FieldValue};
use crate::schema::ModelSchema;
use crate::store::Criterion;

use super::errors::{MarshalError, MarshalResult};
use super::Document;

pub(crate) fn build(
    schema: &ModelSchema,
    document: &Document,
    skip: &BTreeSet<String>,
) -> MarshalResult<Vec<Criterion>> {
    let mut criteria = Vec::new();
    let mut invalid_keys = BTreeSet::new();

    for (key, raw) in document {
        if skip.contains(key) {
            continue;
        }

        let field = match schema.by_json_key(key) {
            Some(field) => field,
            None => {
                invalid_keys.insert(key.clone());
                continue;
            }
        };

        let value = convert::decode_field(field, raw, false)
            .map_err(|failure| MarshalError::from_failure(schema.name(), field, raw, failure))?;

        let attribute = field.attribute.clone();
        criteria.push(match value {
            FieldValue::Null => Criterion::IsNull { attribute },
            value => Criterion::Equals { attribute, value },
        });
    }

    if !invalid_keys.is_empty() {
        return Err(MarshalError::InvalidKeys {
            model: schema.name().to_string(),
            keys: invalid_keys,
        });
    }

    Ok(criteria)
}
