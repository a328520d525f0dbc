//! Inputs handed to every provider invocation (§4.4).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CheckConfig;
use crate::domain::{CheckOutput, HistoryMap, SessionHint};

/// The triggering PR/issue, treated as an opaque input struct — ingestion
/// from a source forge is out of scope for the execution core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrInfo {
    pub number: Option<u64>,
    pub title: String,
    pub body: String,
    pub author: String,
    pub base_branch: String,
    pub head_branch: String,
    pub files_changed: Vec<String>,
}

pub struct ProviderContext<'a> {
    pub pr_info: &'a PrInfo,
    pub config: &'a CheckConfig,
    pub dependency_outputs: &'a HashMap<String, CheckOutput>,
    pub session_hint: Option<&'a SessionHint>,
    pub memory: &'a crate::memory::MemoryStore,
    pub project_root: &'a std::path::Path,
    pub event: &'a str,
    pub iteration_item: Option<&'a Value>,
    pub history: &'a HistoryMap,
    pub loop_idx: u32,
}

impl<'a> ProviderContext<'a> {
    pub fn worktree(&self) -> PathBuf {
        self.project_root.to_path_buf()
    }
}
