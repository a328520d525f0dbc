//! Shared `ProviderContext` builder for provider unit tests.
#![cfg(test)]

use std::collections::HashMap;
use std::path::Path;

use crate::config::CheckConfig;
use crate::domain::{CheckOutput, HistoryMap};
use crate::memory::MemoryStore;

use super::context::{PrInfo, ProviderContext};

pub fn context<'a>(
    pr_info: &'a PrInfo,
    config: &'a CheckConfig,
    deps: &'a HashMap<String, CheckOutput>,
    memory: &'a MemoryStore,
    history: &'a HistoryMap,
    project_root: &'a Path,
) -> ProviderContext<'a> {
    ProviderContext {
        pr_info,
        config,
        dependency_outputs: deps,
        session_hint: None,
        memory,
        project_root,
        event: "manual",
        iteration_item: None,
        history,
        loop_idx: 0,
    }
}
