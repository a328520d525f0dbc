//! [`CheckConfig`] — one node in the pipeline (§3, §4.9).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dependency::DependencyToken;
use super::failure_condition::FailureConditionSpec;
use super::normalize;
use super::retry::RetryPolicy;
use super::routing::RoutingAction;
use crate::domain::TriggerEvent;

fn default_max_loops() -> u32 {
    10
}

fn default_timeout_ms() -> u64 {
    10 * 60 * 1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Filled in from the `checks` map key at load time; not part of the
    /// YAML payload for an individual entry.
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "type")]
    pub check_type: String,

    pub tags: Vec<String>,

    pub group: Option<String>,

    #[serde(rename = "on", deserialize_with = "normalize::on_events")]
    pub on: Vec<TriggerEvent>,

    #[serde(rename = "depends_on", deserialize_with = "normalize::depends_on")]
    pub depends_on: Vec<DependencyToken>,

    #[serde(rename = "if")]
    pub if_expr: Option<String>,

    #[serde(rename = "forEach")]
    pub for_each: bool,

    #[serde(rename = "timeout", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    pub retry: Option<RetryPolicy>,

    pub env: BTreeMap<String, String>,

    pub fail_if: Option<String>,

    pub failure_conditions: BTreeMap<String, FailureConditionSpec>,

    pub on_success: Option<RoutingAction>,
    pub on_fail: Option<RoutingAction>,
    pub on_finish: Option<RoutingAction>,

    pub continue_on_failure: bool,

    #[serde(default = "default_max_loops")]
    pub max_loops: u32,

    pub transform: Option<String>,
    pub transform_js: Option<String>,

    /// Everything else the provider needs: `prompt`, `schema`, `exec`,
    /// `content`, `operation`, `key`, `value`, `value_js`, `memory_js`,
    /// `namespace`, and any provider-specific extension. Kept as a raw
    /// JSON object rather than an enum per provider type, matching the
    /// open-ended "provider-specific payload" shape in §3/§4.9 — the
    /// execution core never interprets these keys itself, only the
    /// resolved provider does (§4.4).
    #[serde(flatten)]
    pub payload: Value,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            check_type: String::new(),
            tags: Vec::new(),
            group: None,
            on: Vec::new(),
            depends_on: Vec::new(),
            if_expr: None,
            for_each: false,
            timeout_ms: default_timeout_ms(),
            retry: None,
            env: BTreeMap::new(),
            fail_if: None,
            failure_conditions: BTreeMap::new(),
            on_success: None,
            on_fail: None,
            on_finish: None,
            continue_on_failure: false,
            max_loops: default_max_loops(),
            transform: None,
            transform_js: None,
            payload: Value::Object(Default::default()),
        }
    }
}

impl CheckConfig {
    /// §3 invariant: `onFinish` is only valid where `forEach: true`.
    pub fn validate(&self) -> Result<(), String> {
        if self.on_finish.is_some() && !self.for_each {
            return Err(format!(
                "check '{}': on_finish is only valid when forEach: true",
                self.id
            ));
        }
        Ok(())
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_finish_requires_for_each() {
        let mut c = CheckConfig {
            id: "aggregate".to_string(),
            ..Default::default()
        };
        c.on_finish = Some(RoutingAction::default());
        assert!(c.validate().is_err());
        c.for_each = true;
        assert!(c.validate().is_ok());
    }
}
