//! Process-wide key/value store (§4.3): namespaced, thread-safe, with
//! optional JSON/CSV file snapshots. Not a durable workflow store — per the
//! spec's Non-goals, state does not survive a process restart unless
//! explicitly saved and reloaded.

mod error;
mod snapshot;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

pub use error::MemoryError;
use snapshot::Namespaces;

use crate::config::{MemoryConfig, MemoryFormat, MemoryStorage};

const DEFAULT_NAMESPACE: &str = "default";

struct Inner {
    namespaces: Namespaces,
}

/// Shared, lock-guarded key/value store. One instance is created per engine
/// run and handed to every provider invocation and sandbox scope as a
/// capability object (§4.3, §9 design note on the "shared singleton with
/// private-field poking" anti-pattern this replaces).
pub struct MemoryStore {
    inner: Mutex<Inner>,
    config: MemoryConfig,
    default_namespace: String,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        let default_namespace = config.namespace.clone().unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        Self {
            inner: Mutex::new(Inner {
                namespaces: HashMap::new(),
            }),
            config,
            default_namespace,
        }
    }

    fn ns<'a>(&'a self, ns: Option<&'a str>) -> &'a str {
        ns.unwrap_or(&self.default_namespace)
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Full read-only snapshot across every namespace, for handing to a
    /// sandbox scope's `memory` capability object.
    pub fn snapshot_all(&self) -> HashMap<String, HashMap<String, Value>> {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.clone()
    }

    /// §4.3: if `storage=file` and `auto_load` is set, populate from the
    /// configured snapshot file.
    pub fn initialize(&self) -> Result<(), MemoryError> {
        if self.config.storage == MemoryStorage::File && self.config.auto_load {
            self.load()?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str, namespace: Option<&str>) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.get(self.ns(namespace)).and_then(|m| m.get(key)).cloned()
    }

    pub fn has(&self, key: &str, namespace: Option<&str>) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .namespaces
            .get(self.ns(namespace))
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    pub fn list(&self, namespace: Option<&str>) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .namespaces
            .get(self.ns(namespace))
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_all(&self, namespace: Option<&str>) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.get(self.ns(namespace)).cloned().unwrap_or_default()
    }

    pub fn list_namespaces(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.keys().cloned().collect()
    }

    pub fn set(&self, key: &str, value: Value, namespace: Option<&str>) {
        let ns = self.ns(namespace).to_string();
        let mut inner = self.inner.lock().unwrap();
        inner.namespaces.entry(ns).or_default().insert(key.to_string(), value);
    }

    /// §4.3: promotes a scalar existing value to `[existing, value]`;
    /// undefined becomes `[value]`.
    pub fn append(&self, key: &str, value: Value, namespace: Option<&str>) {
        let ns = self.ns(namespace).to_string();
        let mut inner = self.inner.lock().unwrap();
        let entries = inner.namespaces.entry(ns).or_default();
        let next = match entries.remove(key) {
            None => Value::Array(vec![value]),
            Some(Value::Array(mut arr)) => {
                arr.push(value);
                Value::Array(arr)
            }
            Some(existing) => Value::Array(vec![existing, value]),
        };
        entries.insert(key.to_string(), next);
    }

    /// §4.3: fails with a `TypeError`-kind error if the existing value is
    /// non-numeric.
    pub fn increment(&self, key: &str, amount: Option<f64>, namespace: Option<&str>) -> Result<f64, MemoryError> {
        let ns = self.ns(namespace).to_string();
        let amount = amount.unwrap_or(1.0);
        let mut inner = self.inner.lock().unwrap();
        let entries = inner.namespaces.entry(ns.clone()).or_default();
        let current = match entries.get(key) {
            None => 0.0,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(_) => {
                return Err(MemoryError::NotNumeric {
                    namespace: ns,
                    key: key.to_string(),
                });
            }
        };
        let next = current + amount;
        entries.insert(
            key.to_string(),
            serde_json::Number::from_f64(next).map(Value::Number).unwrap_or(Value::Null),
        );
        Ok(next)
    }

    pub fn delete(&self, key: &str, namespace: Option<&str>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner
            .namespaces
            .get_mut(self.ns(namespace))
            .map(|m| m.remove(key).is_some())
            .unwrap_or(false)
    }

    /// `clear(None)` clears only the default namespace; there's no
    /// "clear everything" footgun exposed beyond that (mirrors §4.3's
    /// per-namespace clear contract).
    pub fn clear(&self, namespace: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.namespaces.insert(self.ns(namespace).to_string(), HashMap::new());
    }

    fn snapshot_path(&self) -> Result<PathBuf, MemoryError> {
        self.config.file.clone().ok_or(MemoryError::NoFileConfigured)
    }

    pub fn save(&self) -> Result<(), MemoryError> {
        let path = self.snapshot_path()?;
        let inner = self.inner.lock().unwrap();
        match self.config.format {
            MemoryFormat::Json => snapshot::save_json(&path, &inner.namespaces),
            MemoryFormat::Csv => snapshot::save_csv(&path, &inner.namespaces),
        }
    }

    pub fn load(&self) -> Result<(), MemoryError> {
        let path = self.snapshot_path()?;
        let loaded = match self.config.format {
            MemoryFormat::Json => snapshot::load_json(&path)?,
            MemoryFormat::Csv => snapshot::load_csv(&path)?,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.namespaces = loaded;
        Ok(())
    }

    /// Commit a batch of pending sandbox-originated writes (§4.3, §5:
    /// "sandbox writes inside a provider are buffered and committed once").
    /// Also performs the at-most-once `auto_save` per the same section.
    pub fn commit_batch(&self, writes: Vec<crate::sandbox::MemoryWrite>) -> Result<(), MemoryError> {
        use crate::sandbox::MemoryWrite;
        for write in writes {
            match write {
                MemoryWrite::Set { key, value, namespace } => self.set(&key, value, namespace.as_deref()),
                MemoryWrite::Append { key, value, namespace } => self.append(&key, value, namespace.as_deref()),
                MemoryWrite::Increment { key, amount, namespace } => {
                    self.increment(&key, amount, namespace.as_deref())?;
                }
                MemoryWrite::Delete { key, namespace } => {
                    self.delete(&key, namespace.as_deref());
                }
                MemoryWrite::Clear { namespace } => self.clear(namespace.as_deref()),
            }
        }
        if self.config.storage == MemoryStorage::File && self.config.auto_save {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(MemoryConfig::default())
    }

    #[test]
    fn set_then_get_round_trips() {
        let m = store();
        m.set("k", serde_json::json!(42), None);
        assert_eq!(m.get("k", None), Some(serde_json::json!(42)));
    }

    #[test]
    fn delete_then_has_is_false() {
        let m = store();
        m.set("k", serde_json::json!(1), None);
        assert!(m.delete("k", None));
        assert!(!m.has("k", None));
    }

    #[test]
    fn append_promotes_scalar_to_array() {
        let m = store();
        m.set("list", serde_json::json!("first"), None);
        m.append("list", serde_json::json!("second"), None);
        assert_eq!(m.get("list", None), Some(serde_json::json!(["first", "second"])));
    }

    #[test]
    fn append_on_undefined_creates_single_element_array() {
        let m = store();
        m.append("fresh", serde_json::json!("only"), None);
        assert_eq!(m.get("fresh", None), Some(serde_json::json!(["only"])));
    }

    #[test]
    fn increment_defaults_to_one() {
        let m = store();
        assert_eq!(m.increment("counter", None, None).unwrap(), 1.0);
        assert_eq!(m.increment("counter", None, None).unwrap(), 2.0);
        assert_eq!(m.increment("counter", Some(5.0), None).unwrap(), 7.0);
    }

    #[test]
    fn increment_on_non_numeric_fails() {
        let m = store();
        m.set("name", serde_json::json!("not a number"), None);
        assert!(matches!(
            m.increment("name", None, None),
            Err(MemoryError::NotNumeric { .. })
        ));
    }

    #[test]
    fn namespaces_are_isolated() {
        let m = store();
        m.set("k", serde_json::json!("a-value"), Some("nsA"));
        m.set("k", serde_json::json!("b-value"), Some("nsB"));
        assert_ne!(m.get("k", Some("nsA")), m.get("k", Some("nsB")));
    }

    #[test]
    fn clear_only_clears_default_namespace() {
        let m = store();
        m.set("k", serde_json::json!(1), None);
        m.set("k", serde_json::json!(1), Some("other"));
        m.clear(None);
        assert!(!m.has("k", None));
        assert!(m.has("k", Some("other")));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn json_scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| Value::Number(n.into())),
                "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
            ]
        }

        proptest! {
            /// §8 round-trip: `set(k, v) ; get(k) = v` for any scalar JSON value.
            #[test]
            fn set_then_get_round_trips_any_scalar(key in "[a-z]{1,8}", value in json_scalar()) {
                let m = store();
                m.set(&key, value.clone(), None);
                prop_assert_eq!(m.get(&key, None), Some(value));
            }

            /// §8 round-trip: `delete(k) ; has(k) = false`, regardless of what
            /// was there before.
            #[test]
            fn delete_then_has_is_always_false(key in "[a-z]{1,8}", value in json_scalar()) {
                let m = store();
                m.set(&key, value, None);
                m.delete(&key, None);
                prop_assert!(!m.has(&key, None));
            }

            /// §8 invariant: namespace isolation holds for any two distinct
            /// namespace names and any scalar value.
            #[test]
            fn distinct_namespaces_never_leak_into_each_other(
                key in "[a-z]{1,8}",
                a in json_scalar(),
                b in json_scalar(),
            ) {
                let m = store();
                m.set(&key, a.clone(), Some("nsA"));
                m.set(&key, b.clone(), Some("nsB"));
                prop_assert_eq!(m.get(&key, Some("nsA")), Some(a));
                prop_assert_eq!(m.get(&key, Some("nsB")), Some(b));
            }

            /// §8: repeated increments accumulate exactly, regardless of
            /// how many times or by what amount.
            #[test]
            fn repeated_increments_sum_exactly(amounts in proptest::collection::vec(-100i32..100, 1..20)) {
                let m = store();
                let mut expected = 0.0;
                for amount in amounts {
                    expected += amount as f64;
                    let got = m.increment("counter", Some(amount as f64), None).unwrap();
                    prop_assert_eq!(got, expected);
                }
            }
        }
    }
}
