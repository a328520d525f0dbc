//! Result Aggregator (§4.8): turns one [`crate::scheduler::EngineOutput`]
//! into the final [`ExecutionReport`] — tagging, de-duplicating and
//! grouping issues, and finalizing the per-check/global statistics the
//! teacher's `LoopMetrics` computes for loop executions.

mod collapse;

use std::collections::HashMap;

use crate::config::{GroupBy, OutputConfig};
use crate::domain::{
    CheckStats, ExecutionReport, ExecutionStatistics, FailureConditionResult, HistoryMap, Issue, ReviewSummaryReport,
};
use crate::scheduler::EngineOutput;

pub use collapse::collapse_issues;

/// Groups issues by check id (`check/<name>/...` rule prefix) or by
/// `category`, per `output.pr_comment.group_by` (§4.8).
pub fn group_issues(issues: &[Issue], group_by: GroupBy) -> HashMap<String, Vec<Issue>> {
    let mut groups: HashMap<String, Vec<Issue>> = HashMap::new();
    for issue in issues {
        let key = match group_by {
            GroupBy::Check => check_name_from_rule_id(&issue.rule_id).unwrap_or_else(|| "other".to_string()),
            GroupBy::Category => issue.category.to_string(),
        };
        groups.entry(key).or_default().push(issue.clone());
    }
    groups
}

/// Recovers the `<name>` out of a `check/<name>/<rule>` tagged rule id
/// (§4.8's tagging convention); falls back to `None` for untagged system
/// issues (config/provider/routing/sandbox errors that never went through
/// [`Issue::tagged_for`]).
fn check_name_from_rule_id(rule_id: &str) -> Option<String> {
    rule_id.strip_prefix("check/").and_then(|rest| rest.split('/').next()).map(str::to_string)
}

/// Builds the final report from the engine's accumulated state. Total
/// counts come straight off the per-check [`CheckStats`] the scheduler
/// maintained incrementally rather than being recomputed from history, so
/// aggregation stays O(checks) regardless of how many iterations ran.
pub fn aggregate(output: EngineOutput, output_config: &OutputConfig) -> ExecutionReport {
    let EngineOutput {
        run_id,
        started_at,
        plan,
        history,
        stats,
        issues,
        failure_conditions,
        halted,
        last_output,
    } = output;

    let issues = collapse_issues(issues, output_config.pr_comment.collapse);
    let grouped_issues = group_issues(&issues, output_config.pr_comment.group_by);

    let mut checks: Vec<CheckStats> = stats.into_values().collect();
    checks.sort_by(|a, b| a.check_name.cmp(&b.check_name));

    let total_executions: u32 = checks.iter().map(|c| c.total_runs).sum();
    let failed_executions: u32 = checks.iter().map(|c| c.failed_runs).sum();
    let skipped_checks = checks.iter().filter(|c| c.skipped).count();

    let statistics = ExecutionStatistics {
        run_id,
        started_at,
        finished_at: chrono::Utc::now(),
        total_checks_configured: plan.included.len(),
        total_executions,
        failed_executions,
        skipped_checks,
        checks,
    };

    let error = failure_conditions
        .iter()
        .find(|c| c.failed && c.halt_execution)
        .map(|c| format!("{}: {}", c.condition_name, c.message));

    ExecutionReport {
        review_summary: review_summary(issues, grouped_issues, last_output, history, error),
        execution_statistics: statistics,
        failure_conditions: sorted_conditions(failure_conditions),
    }
    .with_halt_note(halted)
}

fn review_summary(
    issues: Vec<Issue>,
    grouped_issues: HashMap<String, Vec<Issue>>,
    output: Option<serde_json::Value>,
    history: HistoryMap,
    error: Option<String>,
) -> ReviewSummaryReport {
    ReviewSummaryReport { issues, grouped_issues, output, history, error }
}

fn sorted_conditions(mut conditions: Vec<FailureConditionResult>) -> Vec<FailureConditionResult> {
    conditions.sort_by(|a, b| a.condition_name.cmp(&b.condition_name));
    conditions
}

/// Small helper trait kept local to the aggregator: halting doesn't change
/// the report's shape, only whether a caller should treat a halt with no
/// `halt_execution` failure condition recorded (shouldn't happen, but the
/// engine's `halted` flag is the authoritative source) as exit code 4.
trait WithHaltNote {
    fn with_halt_note(self, halted: bool) -> Self;
}

impl WithHaltNote for ExecutionReport {
    fn with_halt_note(mut self, halted: bool) -> Self {
        if halted && !self.failure_conditions.iter().any(|c| c.failed && c.halt_execution) {
            self.failure_conditions.push(FailureConditionResult {
                condition_name: "halt".to_string(),
                failed: true,
                severity: crate::domain::Severity::Critical,
                expression: String::new(),
                message: "execution halted".to_string(),
                halt_execution: true,
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_str;
    use crate::domain::{Category, Severity};
    use crate::planner::{build_plan, TagFilter};

    fn issue(rule_id: &str, category: Category) -> Issue {
        Issue {
            file: "a.rs".to_string(),
            line: 1,
            end_line: None,
            rule_id: rule_id.to_string(),
            message: "m".to_string(),
            severity: Severity::Warning,
            category,
            suggestion: None,
            replacement: None,
        }
    }

    #[test]
    fn groups_by_check_name_tagged_prefix() {
        let issues = vec![
            issue("check/categorize/rule-a", Category::Style),
            issue("check/categorize/rule-b", Category::Style),
            issue("check/validate/rule-c", Category::Logic),
        ];
        let groups = group_issues(&issues, GroupBy::Check);
        assert_eq!(groups["categorize"].len(), 2);
        assert_eq!(groups["validate"].len(), 1);
    }

    #[test]
    fn groups_by_category() {
        let issues = vec![issue("check/a/r1", Category::Security), issue("check/b/r2", Category::Security)];
        let groups = group_issues(&issues, GroupBy::Category);
        assert_eq!(groups["security"].len(), 2);
    }

    #[test]
    fn aggregate_populates_grouped_issues_per_output_config() {
        let config = load_str("checks:\n  a:\n    type: noop\n").unwrap();
        let plan = build_plan(&config, &crate::domain::TriggerEvent::Manual, &TagFilter::none()).unwrap();
        let output = EngineOutput {
            run_id: uuid::Uuid::now_v7(),
            started_at: chrono::Utc::now(),
            plan,
            history: HistoryMap::new(),
            stats: HashMap::new(),
            issues: vec![issue("check/a/rule-x", Category::Style), issue("check/a/rule-y", Category::Logic)],
            failure_conditions: Vec::new(),
            halted: false,
            last_output: None,
        };
        let mut output_config = OutputConfig::default();
        output_config.pr_comment.group_by = GroupBy::Check;
        let report = aggregate(output, &output_config);
        assert_eq!(report.review_summary.grouped_issues["a"].len(), 2);
    }

    #[test]
    fn halted_run_gets_exit_relevant_failure_condition() {
        let config = load_str("checks:\n  a:\n    type: noop\n").unwrap();
        let plan = build_plan(&config, &crate::domain::TriggerEvent::Manual, &TagFilter::none()).unwrap();
        let output = EngineOutput {
            run_id: uuid::Uuid::now_v7(),
            started_at: chrono::Utc::now(),
            plan,
            history: HistoryMap::new(),
            stats: HashMap::new(),
            issues: Vec::new(),
            failure_conditions: Vec::new(),
            halted: true,
            last_output: None,
        };
        let report = aggregate(output, &OutputConfig::default());
        assert_eq!(report.exit_code(), 4);
    }
}
