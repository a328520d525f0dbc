//! [`CheckStats`] — per-check statistics accumulated incrementally by the
//! scheduler and finalized by the aggregator (§3, §4.8).

use serde::{Deserialize, Serialize};

use super::iteration::SkipReason;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckStats {
    pub check_name: String,
    pub total_runs: u32,
    pub successful_runs: u32,
    pub failed_runs: u32,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub issues_found: usize,
    pub total_duration_ms: u64,
    pub per_iteration_duration_ms: Vec<u64>,
}

impl CheckStats {
    pub fn new(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            ..Default::default()
        }
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        self.skipped = true;
        self.skip_reason = Some(reason);
    }

    pub fn record_run(&mut self, success: bool, duration_ms: u64, issues_found: usize) {
        self.total_runs += 1;
        if success {
            self.successful_runs += 1;
        } else {
            self.failed_runs += 1;
        }
        self.total_duration_ms += duration_ms;
        self.per_iteration_duration_ms.push(duration_ms);
        self.issues_found += issues_found;
    }

    /// §8 invariant: `totalRuns = successfulRuns + failedRuns`,
    /// `skipped ⇒ totalRuns = 0`.
    pub fn is_consistent(&self) -> bool {
        let sum_ok = self.total_runs == self.successful_runs + self.failed_runs;
        let skip_ok = !self.skipped || self.total_runs == 0;
        sum_ok && skip_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_holds_after_mixed_runs() {
        let mut s = CheckStats::new("categorize");
        s.record_run(true, 10, 0);
        s.record_run(false, 20, 1);
        assert!(s.is_consistent());
        assert_eq!(s.total_runs, 2);
        assert_eq!(s.issues_found, 1);
    }

    #[test]
    fn skip_means_zero_runs() {
        let mut s = CheckStats::new("update-label");
        s.record_skip(SkipReason::DependencyFailed);
        assert!(s.is_consistent());
        assert_eq!(s.total_runs, 0);
    }
}
