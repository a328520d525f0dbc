//! [`ExecutionReport`] — the final artifact returned to the caller (§6).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::history::HistoryMap;
use super::issue::{Issue, Severity};
use super::stats::CheckStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureConditionResult {
    pub condition_name: String,
    pub failed: bool,
    pub severity: Severity,
    pub expression: String,
    pub message: String,
    pub halt_execution: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    /// Identifies one engine run for log correlation (every `tracing` span
    /// emitted during the run is nested under the same run, but carrying
    /// the id on the report itself lets a caller join the two after the
    /// fact without re-parsing logs).
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_checks_configured: usize,
    pub total_executions: u32,
    pub failed_executions: u32,
    pub skipped_checks: usize,
    pub checks: Vec<CheckStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummaryReport {
    pub issues: Vec<Issue>,
    /// Issues regrouped per `output.pr_comment.group_by` (§4.8): key is
    /// either a check id or a category name depending on that setting.
    /// Kept alongside the flat `issues` list rather than replacing it —
    /// consumers that don't care about grouping can ignore this field.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub grouped_issues: HashMap<String, Vec<Issue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    pub history: HistoryMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub review_summary: ReviewSummaryReport,
    pub execution_statistics: ExecutionStatistics,
    pub failure_conditions: Vec<FailureConditionResult>,
}

impl ExecutionReport {
    /// Exit code convention from §6: 0 ok, 1 validation, 2 execution error,
    /// 3 policy/fail-if triggered, 4 halted.
    pub fn exit_code(&self) -> i32 {
        if self.failure_conditions.iter().any(|c| c.failed && c.halt_execution) {
            return 4;
        }
        if self.failure_conditions.iter().any(|c| c.failed) {
            return 3;
        }
        if self.execution_statistics.failed_executions > 0 {
            return 2;
        }
        0
    }
}
