//! Naming conventions for deriving document keys from column names.

use serde::{Deserialize, Serialize};

/// How a column name becomes a document key when nothing overrides it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyConvention {
    /// Use the column name unchanged
    Column,
    /// `last_login` becomes `lastLogin`
    #[default]
    CamelCase,
    /// `lastLogin` becomes `last_login`
    SnakeCase,
}

impl KeyConvention {
    /// Returns the configuration name of the convention
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyConvention::Column => "column",
            KeyConvention::CamelCase => "camel_case",
            KeyConvention::SnakeCase => "snake_case",
        }
    }

    /// Applies the convention to a column name
    pub fn apply(&self, column: &str) -> String {
        match self {
            KeyConvention::Column => column.to_string(),
            KeyConvention::CamelCase => camel_case(column),
            KeyConvention::SnakeCase => snake_case(column),
        }
    }
}

/// Converts a snake_case string to camelCase.
///
/// Leading and trailing underscores are dropped.
pub fn camel_case(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut underscore = false;

    for c in text.trim_matches('_').chars() {
        if c == '_' {
            underscore = true;
        } else if underscore {
            underscore = false;
            output.extend(c.to_uppercase());
        } else {
            output.push(c);
        }
    }

    output
}

/// Converts a camelCase string to snake_case.
///
/// Runs of capitals are kept together, so `HTTPServer` becomes `http_server`.
pub fn snake_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len() + 4);

    for (index, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && index > 0 {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).map_or(false, |n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);

            if boundary && prev != '_' {
                output.push('_');
            }
        }
        output.extend(c.to_lowercase());
    }

    output
}
