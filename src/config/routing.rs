//! [`RoutingAction`] — what to do after a check completes (§3, §4.6.5).

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingAction {
    #[serde(default)]
    pub run: Vec<String>,
    #[serde(default, rename = "run_js", skip_serializing_if = "Option::is_none")]
    pub run_js: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goto: Option<String>,
    #[serde(default, rename = "goto_js", skip_serializing_if = "Option::is_none")]
    pub goto_js: Option<String>,
    #[serde(default, rename = "goto_event", skip_serializing_if = "Option::is_none")]
    pub goto_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

impl RoutingAction {
    pub fn is_empty(&self) -> bool {
        self.run.is_empty() && self.run_js.is_none() && self.goto.is_none() && self.goto_js.is_none()
    }
}
