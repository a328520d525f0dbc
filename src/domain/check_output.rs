//! The redesigned duck-typed-result boundary (§9 of the spec): callers used
//! to reach into either a `ReviewSummary` or its `output` field
//! indiscriminately. Every provider result and every dependency lookup goes
//! through this single tagged variant instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::issue::Issue;

/// What a provider returns for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSummary {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ReviewSummary {
    pub fn ok(output: Value) -> Self {
        Self {
            output: Some(output),
            ..Default::default()
        }
    }

    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            ..Default::default()
        }
    }
}

/// Normalized form of "a dependency's result" as consumed by the scheduler,
/// the sandbox scope, and the aggregator. Replaces the original's
/// duck-typed `ReviewSummary | output | error` access pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutput {
    Summary(ReviewSummary),
    Value(Value),
    Error { kind: String, message: String },
}

impl CheckOutput {
    /// The value callers see when they write `outputs[checkId]` in a
    /// template or sandbox expression: `output` if present, else the whole
    /// summary re-serialized, else the raw value, else null.
    pub fn as_scope_value(&self) -> Value {
        match self {
            Self::Summary(s) => s.output.clone().unwrap_or_else(|| {
                serde_json::to_value(s).unwrap_or(Value::Null)
            }),
            Self::Value(v) => v.clone(),
            Self::Error { kind, message } => serde_json::json!({ "error": message, "kind": kind }),
        }
    }

    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Summary(s) => &s.issues,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Attempt to view this output as an array, for forEach fan-out.
    pub fn as_array(&self) -> Option<Vec<Value>> {
        self.as_scope_value().as_array().cloned()
    }
}

impl From<ReviewSummary> for CheckOutput {
    fn from(s: ReviewSummary) -> Self {
        Self::Summary(s)
    }
}
