//! Per-branch outcome tracking (§4.6.7 state machine; §8 invariants).
//!
//! The scheduler needs, for every `(checkId, branchPath)` it has executed
//! or skipped, enough information to answer two questions for its
//! dependents: "did it succeed" (readiness/ANY-OF gating) and "what did it
//! produce" (the `dependencyOutputs` map handed to the next provider).

use std::collections::HashMap;

use crate::domain::{BranchPath, CheckOutput, IterationResult, SessionHint, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct BranchOutcome {
    pub status: BranchStatus,
    pub skip_reason: Option<SkipReason>,
    pub output: CheckOutput,
    pub session_hint: Option<SessionHint>,
    /// Populated when the check is `forEach: true` and it succeeded with an
    /// array output: the items dependents fan out over.
    pub for_each_items: Option<Vec<serde_json::Value>>,
}

impl BranchOutcome {
    pub fn from_iteration(result: &IterationResult, session_hint: Option<SessionHint>, for_each: bool) -> Self {
        let output = CheckOutput::Value(result.output.clone().unwrap_or(serde_json::Value::Null));
        let for_each_items =
            if for_each && result.success { output.as_array() } else { None };
        Self {
            status: if result.success { BranchStatus::Success } else { BranchStatus::Failed },
            skip_reason: None,
            output,
            session_hint,
            for_each_items,
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            status: BranchStatus::Skipped,
            skip_reason: Some(reason),
            output: CheckOutput::Error {
                kind: "skip".to_string(),
                message: reason.to_string(),
            },
            session_hint: None,
            for_each_items: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BranchStatus::Success
    }
}

/// `checkId -> branchPath -> outcome`, scoped to one loop iteration; routed
/// re-entries start a fresh set of branch outcomes for the re-run check and
/// everything downstream of it (§9: "generation numbers on history entries
/// rather than graph edges").
#[derive(Debug, Default)]
pub struct BranchTracker {
    outcomes: HashMap<String, HashMap<BranchPath, BranchOutcome>>,
}

impl BranchTracker {
    pub fn record(&mut self, check_id: &str, branch: BranchPath, outcome: BranchOutcome) {
        self.outcomes.entry(check_id.to_string()).or_default().insert(branch, outcome);
    }

    pub fn get(&self, check_id: &str, branch: &BranchPath) -> Option<&BranchOutcome> {
        self.outcomes.get(check_id).and_then(|m| m.get(branch))
    }

    /// Clears everything recorded for `check_id` within `branch` (the
    /// re-run ancestor's own prior outcome) and every descendant branch
    /// that extends it, so a routed re-entry doesn't see stale results
    /// from the previous loop when dependents are re-evaluated.
    pub fn clear_descendants(&mut self, branch_prefix: &BranchPath) {
        for branches in self.outcomes.values_mut() {
            branches.retain(|b, _| !branch_extends(b, branch_prefix));
        }
    }
}

fn branch_extends(branch: &BranchPath, prefix: &BranchPath) -> bool {
    branch.0.len() >= prefix.0.len() && branch.0[..prefix.0.len()] == prefix.0[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_descendants_drops_only_matching_prefix() {
        let mut t = BranchTracker::default();
        let root = BranchPath::root();
        let b0 = root.push("list-issues", 0);
        t.record("categorize", b0.clone(), BranchOutcome::skipped(SkipReason::IfFalse));
        t.record("other", root.clone(), BranchOutcome::skipped(SkipReason::IfFalse));
        t.clear_descendants(&b0);
        assert!(t.get("categorize", &b0).is_none());
        assert!(t.get("other", &root).is_some());
    }
}
