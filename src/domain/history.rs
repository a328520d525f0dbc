//! Append-only per-check history (§3, §4.6.6 aggregation correctness).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: Value,
    pub loop_idx: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryMap(pub HashMap<String, Vec<HistoryEntry>>);

impl HistoryMap {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn append(&mut self, check_id: &str, value: Value, loop_idx: u32) {
        self.0
            .entry(check_id.to_string())
            .or_default()
            .push(HistoryEntry { value, loop_idx });
    }

    pub fn get(&self, check_id: &str) -> &[HistoryEntry] {
        self.0.get(check_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Entries recorded during a specific loop of the check (or of the
    /// forEach ancestor that drove it). Used to recover "the current wave"
    /// per the §4.6.6 aggregation invariant.
    pub fn entries_for_loop(&self, check_id: &str, loop_idx: u32) -> Vec<&HistoryEntry> {
        self.get(check_id).iter().filter(|e| e.loop_idx == loop_idx).collect()
    }

    /// Fallback when loop tagging is unavailable: the last `n` entries.
    pub fn last_n(&self, check_id: &str, n: usize) -> Vec<&HistoryEntry> {
        let all = self.get(check_id);
        let start = all.len().saturating_sub(n);
        all[start..].iter().collect()
    }

    pub fn max_loop_idx(&self, check_id: &str) -> Option<u32> {
        self.get(check_id).iter().map(|e| e.loop_idx).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_for_loop_filters_by_loop_idx() {
        let mut h = HistoryMap::new();
        h.append("categorize", serde_json::json!("a"), 0);
        h.append("categorize", serde_json::json!("b"), 0);
        h.append("categorize", serde_json::json!("c"), 1);

        assert_eq!(h.entries_for_loop("categorize", 0).len(), 2);
        assert_eq!(h.entries_for_loop("categorize", 1).len(), 1);
        assert_eq!(h.max_loop_idx("categorize"), Some(1));
    }
}
