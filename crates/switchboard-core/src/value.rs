//! Helpers for the dynamic values carried through a dispatch cycle.
//!
//! Facts, results, backreferences and URL parameter bags are all plain
//! [`serde_json::Value`]s. The functions here give them the scalar semantics
//! the conditions rely on.

use serde_json::Value;

/// Render a scalar value as text.
///
/// Returns `None` for `null`, arrays and objects, which have no canonical
/// textual form.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Read a value as a finite number.
///
/// JSON numbers qualify directly. Strings qualify when the whole string
/// (no surrounding whitespace) parses as a finite float, so `"42"`, `"-1.5"`
/// and `"1e3"` do while `"inf"`, `" 4"` and `""` do not.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            if s.is_empty() || s.trim() != s {
                return None;
            }
            s.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Read a value as an exact integer.
///
/// JSON integers (signed or unsigned) and strings holding only a decimal
/// integer qualify. Used before [`as_number`] so that integers beyond the
/// `f64` mantissa keep their identity.
pub fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Value::String(s) => {
            if s.is_empty() || s.trim() != s {
                return None;
            }
            s.parse::<i128>().ok()
        }
        _ => None,
    }
}

/// Whether a value is numeric in the sense of [`as_number`].
pub fn is_numeric(value: &Value) -> bool {
    as_number(value).is_some()
}

/// Numeric-aware loose equality.
///
/// - `null` never equals anything, itself included.
/// - When both sides read as integers they compare exactly
///   (`"42" == 42`, `"9007199254740993" != 9007199254740992`).
/// - Otherwise, when both sides read as numbers they compare as floats
///   (`"042" == 42.0`, `"42.0" == 42`).
/// - Otherwise scalars compare by their text (`"true" == true`,
///   `"abc" != 0`).
/// - Arrays and objects compare structurally.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }

    if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
        return a == b;
    }

    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a == b;
    }

    match (display_value(left), display_value(right)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => left == right,
        _ => false,
    }
}
