//! JS-flavored coercions over `serde_json::Value`, used by the evaluator and
//! builtins so comparisons/arithmetic behave the way check authors expect
//! from a JS-like expression grammar (§4.1).

use serde_json::Value;

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(arr) if arr.is_empty() => 0.0,
        Value::Array(arr) if arr.len() == 1 => to_number(&arr[0]),
        _ => f64::NAN,
    }
}

pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(arr) => arr.iter().map(to_display_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

pub fn number_value(n: f64) -> Value {
    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// Loose (`==`) equality: numeric coercion across mismatched scalar types,
/// otherwise structural equality.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) | (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            to_number(a) == to_number(b)
        }
        _ => false,
    }
}
