//! Named `failure_conditions` entries (§4.6.4, §6).

use serde::{Deserialize, Serialize};

use crate::domain::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConditionSpec {
    pub condition: String,
    pub message: String,
    pub severity: Severity,
    pub halt_execution: bool,
}

impl Default for FailureConditionSpec {
    fn default() -> Self {
        Self {
            condition: "false".to_string(),
            message: String::new(),
            severity: Severity::Error,
            halt_execution: false,
        }
    }
}
