//! [`IterationResult`] — the immutable record of one provider invocation,
//! and the reasons a WorkItem can be skipped instead of run (§4.6.3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::branch::BranchPath;
use super::issue::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DependencyFailed,
    DependencySkipped,
    IfFalse,
    HaltedByCondition,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DependencyFailed => "dependency_failed",
            Self::DependencySkipped => "dependency_skipped",
            Self::IfFalse => "if_false",
            Self::HaltedByCondition => "halted_by_condition",
        };
        write!(f, "{s}")
    }
}

/// Result of one provider invocation. Appended to `history[checkId]` and
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub check_id: String,
    pub branch_path: BranchPath,
    pub loop_idx: u32,
    pub success: bool,
    pub issues: Vec<Issue>,
    pub output: Option<Value>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub session_id: Option<String>,
}

impl IterationResult {
    pub fn skipped(check_id: impl Into<String>, branch_path: BranchPath, loop_idx: u32) -> Self {
        Self {
            check_id: check_id.into(),
            branch_path,
            loop_idx,
            success: false,
            issues: Vec::new(),
            output: None,
            error_message: None,
            duration_ms: 0,
            session_id: None,
        }
    }
}
