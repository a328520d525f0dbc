//! Opaque session-reuse hint threaded between checks (§9 design note).
//!
//! The scheduler carries this from a parent `IterationResult` to a
//! dependent's `WorkItem` without interpreting it; only AI-style providers
//! give it meaning.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReuseMode {
    Clone,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHint {
    pub parent_session_id: Option<String>,
    pub reuse_mode: ReuseMode,
}
