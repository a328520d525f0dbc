//! [`WorkItem`] — one scheduled execution of a check in a concrete branch.

use std::collections::HashMap;

use serde_json::Value;

use super::branch::BranchPath;
use super::check_output::CheckOutput;
use super::session::SessionHint;

#[derive(Debug, Clone)]
pub struct WorkItem {
    pub check_id: String,
    pub branch_path: BranchPath,
    pub loop_count: u32,
    pub iteration_item: Option<Value>,
    pub dependency_outputs: HashMap<String, CheckOutput>,
    pub event: String,
    pub session_hint: Option<SessionHint>,
}

impl WorkItem {
    pub fn new(check_id: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            branch_path: BranchPath::root(),
            loop_count: 0,
            iteration_item: None,
            dependency_outputs: HashMap::new(),
            event: event.into(),
            session_hint: None,
        }
    }

    pub fn with_branch(mut self, branch_path: BranchPath) -> Self {
        self.branch_path = branch_path;
        self
    }

    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_iteration_item(mut self, item: Value) -> Self {
        self.iteration_item = Some(item);
        self
    }

    /// The loop index this WorkItem will be recorded under in the history
    /// map (§3 invariants): the current loop count of the forEach ancestor
    /// it descends from, or its own loop count at the root.
    pub fn loop_idx(&self) -> u32 {
        self.loop_count
    }
}
