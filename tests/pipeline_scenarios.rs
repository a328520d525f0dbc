//! End-to-end pipeline scenarios exercising the scheduler, router, and
//! aggregator together through the public `run_pipeline` entry point,
//! against real YAML configs rather than unit-level scheduler state.

use visor::config::load_str;
use visor::domain::{ExecutionReport, SkipReason};
use visor::planner::TagFilter;
use visor::providers::{PrInfo, ProviderRegistry};
use visor::scheduler::RunRequest;
use visor::{run_pipeline, TriggerEvent};

fn stats<'a>(report: &'a ExecutionReport, check_name: &str) -> Option<&'a visor::domain::CheckStats> {
    report.execution_statistics.checks.iter().find(|c| c.check_name == check_name)
}

async fn run(yaml: &str, request: RunRequest) -> ExecutionReport {
    let config = load_str(yaml).unwrap();
    run_pipeline(config, ProviderRegistry::standard(), ".", request).await.unwrap()
}

/// S1: a forEach chain where the middle check fails for exactly one branch;
/// under `max_parallelism: 1` every branch's dependents finish before the
/// next branch starts, and only the two non-failing branches reach the
/// final check.
#[tokio::test]
async fn for_each_chain_skips_dependents_of_one_failing_branch() {
    let yaml = r#"
max_parallelism: 1
checks:
  list-issues:
    type: transform
    forEach: true
    transform_js: "return ['ISSUE-1', 'ISSUE-2', 'ISSUE-3'];"
  categorize:
    type: transform
    depends_on: list-issues
    transform_js: "return { item: outputs['list-issues'], blocked: outputs['list-issues'] == 'ISSUE-2' };"
    fail_if: "output.blocked"
  update-label:
    type: noop
    depends_on: categorize
"#;
    let report = run(yaml, RunRequest::default()).await;

    let categorize = stats(&report, "categorize").unwrap();
    assert_eq!(categorize.total_runs, 3);
    assert_eq!(categorize.failed_runs, 1);
    assert_eq!(categorize.successful_runs, 2);

    let update_label = stats(&report, "update-label").unwrap();
    assert_eq!(update_label.total_runs, 2, "the ISSUE-2 branch's dependent never runs");
    assert_eq!(update_label.successful_runs, 2);

    assert!(report.review_summary.issues.iter().any(|i| i.rule_id == "check/categorize/fail_if"));
}

/// S2: a forEach check whose `onFinish` reads and writes a memory counter
/// through `goto_js`, looping the whole fan-out exactly once before the
/// second pass re-evaluates every item as valid.
#[tokio::test]
async fn on_finish_goto_reruns_the_fan_out_once_using_a_memory_counter() {
    let yaml = r#"
max_parallelism: 1
checks:
  start:
    type: noop
  extract-facts:
    type: transform
    depends_on: start
    forEach: true
    transform_js: "return [1, 2, 3, 4, 5, 6];"
    on_finish:
      goto_js: "const firstPass = !memory.has('attempt'); firstPass ? memory.set('attempt', 1) : null; return firstPass ? 'start' : null;"
  validate:
    type: transform
    depends_on: extract-facts
    transform_js: "const attempt = memory.get('attempt'); return { item: outputs['extract-facts'], valid: (attempt >= 1) || (outputs['extract-facts'] > 3) };"
"#;
    let report = run(yaml, RunRequest::default()).await;

    assert_eq!(stats(&report, "start").unwrap().total_runs, 2);
    assert_eq!(stats(&report, "extract-facts").unwrap().total_runs, 2);
    assert_eq!(stats(&report, "validate").unwrap().total_runs, 12);

    let history = &report.review_summary.history;
    let first_pass = history.entries_for_loop("validate", 0);
    assert_eq!(first_pass.len(), 6);
    let first_pass_valid: Vec<bool> = first_pass.iter().map(|e| e.value["valid"].as_bool().unwrap()).collect();
    assert_eq!(first_pass_valid, vec![false, false, false, true, true, true], "items 1-3 invalid, 4-6 valid on the first pass");

    let second_pass = history.entries_for_loop("validate", 1);
    assert_eq!(second_pass.len(), 6);
    assert!(second_pass.iter().all(|e| e.value["valid"].as_bool().unwrap()), "every item reports valid once attempt >= 1");
}

/// S3: a `failure_conditions` entry with `halt_execution: true` stops the
/// run the moment it fires, and everything still downstream is recorded as
/// halted rather than executed.
#[tokio::test]
async fn halting_failure_condition_skips_downstream_checks() {
    let yaml = r#"
checks:
  critical-check:
    type: transform
    transform_js: "return { critical: true };"
    failure_conditions:
      critical_failure:
        condition: "output.critical"
        message: "critical issue detected"
        severity: critical
        halt_execution: true
  dependent-check:
    type: noop
    depends_on: critical-check
"#;
    let report = run(yaml, RunRequest::default()).await;

    let dependent = stats(&report, "dependent-check").unwrap();
    assert!(dependent.skipped);
    assert_eq!(dependent.skip_reason, Some(SkipReason::HaltedByCondition));
    assert_eq!(dependent.total_runs, 0);

    let condition = report.failure_conditions.iter().find(|c| c.condition_name == "critical_failure").unwrap();
    assert!(condition.failed);
    assert!(condition.halt_execution);
    assert_eq!(report.exit_code(), 4);
}

/// S4: an ANY-OF dependency is satisfied by whichever single member the
/// triggering event actually included; the excluded member never runs.
#[tokio::test]
async fn any_of_dependency_is_satisfied_by_the_triggering_events_branch() {
    let yaml = r#"
checks:
  parse-pr:
    type: noop
    on: pr_opened
  parse-comment:
    type: noop
    on: issue_comment
  triage:
    type: noop
    depends_on: "parse-pr|parse-comment"
"#;
    let request = RunRequest { event: TriggerEvent::IssueComment, tag_filter: TagFilter::none(), pr_info: PrInfo::default() };
    let report = run(yaml, request).await;

    assert_eq!(stats(&report, "parse-comment").unwrap().total_runs, 1);
    assert_eq!(stats(&report, "triage").unwrap().total_runs, 1);
    assert!(stats(&report, "parse-pr").is_none(), "parse-pr was excluded by the event filter, never scheduled");
}

/// S5: `fail_if` routes to an ancestor via `goto`, and a memory counter
/// bumped from the routed-from check's own `on_fail` survives every loop;
/// routing still stops no later than the target's `max_loops`.
#[tokio::test]
async fn memory_counter_with_goto_stops_at_max_loops() {
    let yaml = r#"
max_parallelism: 1
checks:
  gate:
    type: noop
    max_loops: 3
  check-task:
    type: noop
    depends_on: gate
    fail_if: "true"
    on_fail:
      run: [increment-retry]
      goto: gate
  increment-retry:
    type: memory
    operation: increment
    key: retry_count
"#;
    let report = run(yaml, RunRequest::default()).await;

    let gate = stats(&report, "gate").unwrap();
    let check_task = stats(&report, "check-task").unwrap();
    assert_eq!(gate.total_runs, 3, "gate re-runs twice via goto, then max_loops stops it");
    assert_eq!(check_task.total_runs, 3);
    assert_eq!(check_task.failed_runs, 3);

    assert!(stats(&report, "increment-retry").unwrap().total_runs >= 1);
    assert!(report.review_summary.issues.iter().any(|i| i.rule_id == "routing/max_loops"));
}

/// S6: tag filtering excludes a check, and anything depending on it is
/// soft-dropped from the plan entirely rather than scheduled and skipped.
#[tokio::test]
async fn excluded_tag_soft_drops_its_dependents() {
    let yaml = r#"
checks:
  fast-check:
    type: noop
    tags: [fast]
  slow-check:
    type: noop
    tags: [slow]
  downstream:
    type: noop
    depends_on: slow-check
    tags: [fast]
"#;
    let request = RunRequest {
        event: TriggerEvent::Manual,
        tag_filter: TagFilter { include: Some(vec!["fast".to_string()]), exclude: None },
        pr_info: PrInfo::default(),
    };
    let report = run(yaml, request).await;

    assert_eq!(stats(&report, "fast-check").unwrap().total_runs, 1);
    assert!(stats(&report, "slow-check").is_none());
    assert!(stats(&report, "downstream").is_none(), "downstream depends on an excluded check and is never scheduled");
}
