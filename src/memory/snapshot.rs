//! JSON and CSV snapshot codecs for the memory store (§4.3, §6).

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use super::error::MemoryError;

pub type Namespaces = HashMap<String, HashMap<String, Value>>;

pub fn save_json(path: &Path, namespaces: &Namespaces) -> Result<(), MemoryError> {
    let text = serde_json::to_string_pretty(namespaces)?;
    std::fs::write(path, text)?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Namespaces, MemoryError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// CSV layout per §6: header `namespace,key,value,type`, one row per key.
/// Arrays/objects are JSON-encoded in the `value` column with
/// `type=array`/`type=object`; scalars keep their natural textual form with
/// `type` recording how to parse them back.
pub fn save_csv(path: &Path, namespaces: &Namespaces) -> Result<(), MemoryError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["namespace", "key", "value", "type"])?;
    for (ns, entries) in namespaces {
        for (key, value) in entries {
            let (value_str, type_str) = encode_value(value);
            writer.write_record([ns.as_str(), key.as_str(), &value_str, type_str])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn load_csv(path: &Path) -> Result<Namespaces, MemoryError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut namespaces: Namespaces = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let ns = record.get(0).unwrap_or("default").to_string();
        let key = record.get(1).unwrap_or("").to_string();
        let value_str = record.get(2).unwrap_or("");
        let type_str = record.get(3).unwrap_or("string");
        let value = decode_value(value_str, type_str);
        namespaces.entry(ns).or_default().insert(key, value);
    }
    Ok(namespaces)
}

fn encode_value(value: &Value) -> (String, &'static str) {
    match value {
        Value::Array(_) => (value.to_string(), "array"),
        Value::Object(_) => (value.to_string(), "object"),
        Value::Number(n) => (n.to_string(), "number"),
        Value::Bool(b) => (b.to_string(), "bool"),
        Value::Null => (String::new(), "null"),
        Value::String(s) => (s.clone(), "string"),
    }
}

fn decode_value(value_str: &str, type_str: &str) -> Value {
    match type_str {
        "array" | "object" => serde_json::from_str(value_str).unwrap_or(Value::Null),
        "number" => value_str
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "bool" => value_str.parse::<bool>().map(Value::Bool).unwrap_or(Value::Null),
        "null" => Value::Null,
        _ => Value::String(value_str.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_round_trips_namespaces_and_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mem.json");
        let mut namespaces: Namespaces = HashMap::new();
        namespaces.insert(
            "default".to_string(),
            HashMap::from([("retry_count".to_string(), serde_json::json!(3))]),
        );
        namespaces.insert(
            "issues".to_string(),
            HashMap::from([("seen".to_string(), serde_json::json!(["a", "b"]))]),
        );

        save_json(&path, &namespaces).unwrap();
        let loaded = load_json(&path).unwrap();
        assert_eq!(loaded, namespaces);
    }

    #[test]
    fn csv_round_trips_scalars_and_arrays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mem.csv");
        let mut namespaces: Namespaces = HashMap::new();
        namespaces.insert(
            "default".to_string(),
            HashMap::from([
                ("retry_count".to_string(), serde_json::json!(3)),
                ("done".to_string(), serde_json::json!(true)),
                ("tags".to_string(), serde_json::json!(["a", "b", "c"])),
            ]),
        );

        save_csv(&path, &namespaces).unwrap();
        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded["default"]["retry_count"], serde_json::json!(3.0));
        assert_eq!(loaded["default"]["done"], serde_json::json!(true));
        assert_eq!(loaded["default"]["tags"], serde_json::json!(["a", "b", "c"]));
    }
}
