use serde_json::Value;
use std::cmp::Ordering;

/// Human-readable JSON type name, used in validation messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A value counts as empty when it is null or the empty string.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Total order over JSON values used for sorting.
///
/// Nulls sort last. Mixed types fall back to a fixed rank so that sorting
/// never fails on heterogeneous collections.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,

        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),

        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

/// Equality as used by query filters.
///
/// Query parameters arrive as strings, so a string filter also matches a
/// number or boolean with the same textual form. An array field matches when
/// any element matches.
pub fn values_match(stored: &Value, expected: &Value) -> bool {
    if stored == expected {
        return true;
    }
    match (stored, expected) {
        (Value::Array(items), _) => items.iter().any(|item| values_match(item, expected)),
        (Value::Number(n), Value::String(s)) => n.to_string() == *s,
        (Value::Bool(b), Value::String(s)) => b.to_string() == *s,
        _ => false,
    }
}

/// Case-insensitive substring search over a value.
///
/// Strings are matched directly. Objects (locale maps) match when any of their
/// string values match.
pub fn contains_insensitive(value: &Value, needle_lower: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle_lower),
        Value::Object(map) => map
            .values()
            .any(|inner| contains_insensitive(inner, needle_lower)),
        _ => false,
    }
}
