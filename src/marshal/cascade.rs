//! Relation cascading
//!
//! A [`Cascade`] says which relation hops a serialization follows. The
//! JSON form is `false`, `true`, a depth integer, or an object keyed by
//! relation key or attribute.
//!
//! An object entry is the spec of the hop it names:
//!
//! | entry          | hop followed | spec applied to the related record |
//! |----------------|--------------|------------------------------------|
//! | `false` / `0`  | no           |                                    |
//! | `n > 0`        | yes          | `n - 1`                            |
//! | `true`         | yes          | `true`                             |
//! | object         | yes          | the object                         |
//! | absent         | no           |                                    |
//!
//! Negative integers mean no cascade.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::FieldDescriptor;

use super::errors::MarshalError;

/// Cascade spec for one serialization level
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Cascade {
    #[default]
    None,
    Unbounded,
    Depth(u32),
    PerRelation(BTreeMap<String, Cascade>),
}

impl Cascade {
    /// Per-relation spec from `(key, spec)` pairs
    pub fn per_relation<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Cascade)>,
        K: Into<String>,
    {
        Cascade::PerRelation(entries.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    /// Spec for the record behind `relation`, or `None` when the hop is
    /// not followed
    pub fn step(&self, relation: &FieldDescriptor) -> Option<Cascade> {
        match self {
            Cascade::PerRelation(entries) => entries
                .get(&relation.json_key)
                .or_else(|| entries.get(&relation.attribute))
                .and_then(Cascade::hop),
            other => other.hop(),
        }
    }

    /// Treats `self` as the spec of one hop
    fn hop(&self) -> Option<Cascade> {
        match self {
            Cascade::None | Cascade::Depth(0) => None,
            Cascade::Depth(n) => Some(Cascade::Depth(n - 1)),
            Cascade::Unbounded => Some(Cascade::Unbounded),
            Cascade::PerRelation(entries) => Some(Cascade::PerRelation(entries.clone())),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cascade::None)
    }
}

impl From<bool> for Cascade {
    fn from(follow: bool) -> Self {
        if follow {
            Cascade::Unbounded
        } else {
            Cascade::None
        }
    }
}

impl From<u32> for Cascade {
    fn from(depth: u32) -> Self {
        Cascade::Depth(depth)
    }
}

impl TryFrom<Value> for Cascade {
    type Error = MarshalError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null | Value::Bool(false) => Ok(Cascade::None),
            Value::Bool(true) => Ok(Cascade::Unbounded),
            Value::Number(n) => {
                if let Some(depth) = n.as_u64() {
                    Ok(Cascade::Depth(u32::try_from(depth).unwrap_or(u32::MAX)))
                } else if n.as_i64().is_some() {
                    Ok(Cascade::None)
                } else {
                    Err(MarshalError::InvalidCascade(format!(
                        "depth must be an integer, got {}",
                        n
                    )))
                }
            }
            Value::Object(entries) => entries
                .into_iter()
                .map(|(key, spec)| Cascade::try_from(spec).map(|c| (key, c)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Cascade::PerRelation),
            other => Err(MarshalError::InvalidCascade(format!(
                "expected bool, integer or object, got {}",
                other
            ))),
        }
    }
}

impl From<Cascade> for Value {
    fn from(cascade: Cascade) -> Self {
        match cascade {
            Cascade::None => Value::Bool(false),
            Cascade::Unbounded => Value::Bool(true),
            Cascade::Depth(n) => Value::from(n),
            Cascade::PerRelation(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, spec)| (key, Value::from(spec)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}
