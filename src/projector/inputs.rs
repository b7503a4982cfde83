//! Conversion of template inputs into the remote `name` / `type:value`
//! representation.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use thiserror::Error;

/// Errors raised while converting an `inputs` list.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InputsError {
    /// Raised when a list element is not an object.
    #[error("inputs entry {index} must be a map of name to 'type:value'")]
    NotAMap {
        /// Position of the offending element.
        index: usize,
    },
    /// Raised when an input name is empty.
    #[error("inputs entry {index} contains an empty input name")]
    EmptyName {
        /// Position of the offending element.
        index: usize,
    },
    /// Raised when an input value is not a string.
    #[error("input '{name}' must be a string in the form 'type:value'")]
    NotAString {
        /// Input name.
        name: String,
    },
    /// Raised when an input value does not follow `type:value`.
    #[error("input '{name}' value '{value}' must be in format of 'type:value'")]
    Malformed {
        /// Input name.
        name: String,
        /// Raw value supplied by the caller.
        value: String,
    },
    /// Raised when the same input name appears more than once.
    #[error("input '{name}' is declared more than once")]
    Duplicate {
        /// Input name.
        name: String,
    },
}

/// Converts `[{NAME = "type:value", ...}, ...]` into a name-sorted list of
/// `{"name": NAME, "value": "type:value"}` objects.
pub(crate) fn convert(entries: &[Value]) -> Result<Value, InputsError> {
    let mut inputs = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate() {
        let map = entry.as_object().ok_or(InputsError::NotAMap { index })?;
        for (name, raw) in map {
            let input_name = name.trim();
            if input_name.is_empty() {
                return Err(InputsError::EmptyName { index });
            }
            let value = parse_value(input_name, raw)?;
            if inputs.insert(input_name.to_owned(), value).is_some() {
                return Err(InputsError::Duplicate {
                    name: input_name.to_owned(),
                });
            }
        }
    }

    Ok(Value::Array(
        inputs
            .into_iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect(),
    ))
}

fn parse_value(name: &str, raw: &Value) -> Result<String, InputsError> {
    let text = raw.as_str().ok_or_else(|| InputsError::NotAString {
        name: name.to_owned(),
    })?;
    let malformed = || InputsError::Malformed {
        name: name.to_owned(),
        value: text.to_owned(),
    };
    let (kind, value) = text.split_once(':').ok_or_else(malformed)?;
    if kind.is_empty() || !kind.chars().all(is_word_char) || value.is_empty() {
        return Err(malformed());
    }
    Ok(format!("{kind}:{value}"))
}

const fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
