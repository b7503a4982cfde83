//! Field maps exchanged with the remote API and the presence rules applied
//! to them.

use serde_json::{Map, Value};

/// Attribute name to value mapping used for requests, responses, and
/// desired-state records.
pub type Fields = Map<String, Value>;

/// Reports whether `value` counts as set on a typed record.
///
/// Zero values (`null`, `false`, `0`, `""`, empty lists and empty objects)
/// are indistinguishable from an attribute the caller never wrote, so they
/// are treated as absent.
#[must_use]
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => !is_zero_number(number),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

fn is_zero_number(number: &serde_json::Number) -> bool {
    if let Some(signed) = number.as_i64() {
        return signed == 0;
    }
    if let Some(unsigned) = number.as_u64() {
        return unsigned == 0;
    }
    number.as_f64().is_some_and(|float| float.abs() < f64::EPSILON)
}

/// Drops unset entries from an object, keeping the remaining order.
pub(crate) fn retain_set(entries: &Fields) -> Fields {
    entries
        .iter()
        .filter(|(_, value)| is_set(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
