//! Scheduler / Execution Engine (§4.6): walks a [`Plan`] with bounded
//! parallelism, fanning `forEach` checks out across branches, applying
//! `fail_if`/`failure_conditions`/routing, and handing the accumulated
//! state to the Result Aggregator.
//!
//! Grounded in the teacher's worker-pool + single-writer coordinator split
//! (`scheduler/core.rs`, `coordinator/core.rs`): one coordinator owns all
//! mutable scheduling state (the work stack, [`BranchTracker`],
//! [`RoutingController`], [`WaveTracker`], history, stats); spawned tasks
//! only execute a provider and report back over an mpsc channel, mirroring
//! `Scheduler::complete`/`Notify` rather than sharing a mutex across tasks.

mod branch;
mod routing;
mod wave;

pub use branch::{BranchOutcome, BranchStatus, BranchTracker};
pub use routing::RoutingController;
pub use wave::{WaveKey, WaveTracker};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::{CheckConfig, Config, RoutingAction};
use crate::domain::{
    BranchPath, CheckOutput, CheckStats, FailureConditionResult, HistoryMap, Issue, ReuseMode, ReviewSummary,
    Severity, SessionHint, SkipReason, TriggerEvent, WorkItem,
};
use crate::error::VisorError;
use crate::memory::MemoryStore;
use crate::planner::{build_plan, Plan, PlanError, ResolvedDependency, TagFilter};
use crate::providers::{PrInfo, ProviderContext, ProviderRegistry};
use crate::sandbox::{is_truthy, Sandbox, Scope};

/// Inputs to one engine run, beyond the static [`Config`].
#[derive(Default)]
pub struct RunRequest {
    pub event: TriggerEvent,
    pub tag_filter: TagFilter,
    pub pr_info: PrInfo,
}

impl Default for TriggerEvent {
    fn default() -> Self {
        TriggerEvent::Manual
    }
}

/// What the aggregator needs once the coordinator loop finishes.
pub struct EngineOutput {
    pub run_id: Uuid,
    pub started_at: chrono::DateTime<Utc>,
    pub plan: Plan,
    pub history: HistoryMap,
    pub stats: HashMap<String, CheckStats>,
    pub issues: Vec<Issue>,
    pub failure_conditions: Vec<FailureConditionResult>,
    pub halted: bool,
    pub last_output: Option<Value>,
}

/// Drives one pipeline run end to end.
pub struct Engine {
    config: Arc<Config>,
    providers: Arc<ProviderRegistry>,
    memory: Arc<MemoryStore>,
    project_root: PathBuf,
}

impl Engine {
    pub fn new(config: Config, providers: ProviderRegistry, memory: MemoryStore, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            providers: Arc::new(providers),
            memory: Arc::new(memory),
            project_root: project_root.into(),
        }
    }

    #[instrument(skip_all, fields(event = %request.event))]
    pub async fn run(&self, request: RunRequest) -> Result<EngineOutput, VisorError> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        self.memory.initialize().map_err(|e| VisorError::Config {
            kind: "memory".to_string(),
            message: e.to_string(),
        })?;

        let plan = build_plan(&self.config, &request.event, &request.tag_filter).map_err(plan_error_to_visor)?;

        let mut coordinator = Coordinator {
            config: Arc::clone(&self.config),
            providers: Arc::clone(&self.providers),
            memory: Arc::clone(&self.memory),
            pr_info: Arc::new(request.pr_info),
            project_root: self.project_root.clone(),
            current_event: request.event.name().to_string(),
            plan,
            stack: Vec::new(),
            branches: BranchTracker::default(),
            routing: RoutingController::default(),
            wave: WaveTracker::default(),
            history: HistoryMap::new(),
            stats: HashMap::new(),
            issues: Vec::new(),
            failure_conditions: Vec::new(),
            halted: false,
            halt_token: CancellationToken::new(),
            last_output: None,
        };

        coordinator.seed();
        coordinator.drive().await;

        Ok(EngineOutput {
            run_id,
            started_at,
            plan: coordinator.plan,
            history: coordinator.history,
            stats: coordinator.stats,
            issues: coordinator.issues,
            failure_conditions: coordinator.failure_conditions,
            halted: coordinator.halted,
            last_output: coordinator.last_output,
        })
    }
}

fn plan_error_to_visor(err: PlanError) -> VisorError {
    match err {
        PlanError::UnknownDependency { check_id, dependency } => VisorError::Config {
            kind: "unknown_dependency".to_string(),
            message: format!("check '{check_id}' depends on unknown check '{dependency}'"),
        },
        PlanError::Cycle(cycle) => VisorError::Config {
            kind: "cycle".to_string(),
            message: format!("dependency cycle detected: {cycle:?}"),
        },
    }
}

enum Readiness {
    Ready { dependency_outputs: HashMap<String, CheckOutput>, session_hint: Option<SessionHint> },
    Skip(SkipReason),
}

/// One provider invocation's raw outcome, before `transform_js`/`fail_if`
/// have been applied — those run back on the coordinator, single-writer.
enum RunOutcome {
    Ok { summary: ReviewSummary, duration_ms: u64 },
    Err { message: String, rule_id: &'static str, duration_ms: u64 },
}

struct Completion {
    item: WorkItem,
    dependency_outputs: HashMap<String, CheckOutput>,
    outcome: RunOutcome,
}

/// The dependency branch of `dep_id` as seen from `branch`: if `dep_id`
/// itself contributed a forEach hop to `branch`, its own outcome was
/// recorded one hop shallower (§4.6.1/§4.6.2). Assumes an ancestor
/// contributes at most one hop per branch — true for every forEach
/// lineage the spec describes (no check forEach's over the same ancestor
/// twice within one branch).
fn dependency_branch(dep_id: &str, branch: &BranchPath) -> BranchPath {
    match branch.0.iter().position(|(id, _)| id == dep_id) {
        Some(pos) => BranchPath(branch.0[..pos].to_vec()),
        None => branch.clone(),
    }
}

/// The value a dependent sees at `outputs[depId]` (§4.6.2): the dependency's
/// whole output, unless `branch` threads through `dep_id` as a forEach
/// ancestor, in which case it's the single element at that branch's
/// iteration index for `dep_id`.
fn dependency_output_for_branch(dep_id: &str, branch: &BranchPath, outcome: &BranchOutcome) -> CheckOutput {
    match branch.index_for(dep_id) {
        Some(idx) => match outcome.output.as_array().and_then(|items| items.into_iter().nth(idx)) {
            Some(element) => CheckOutput::Value(element),
            None => outcome.output.clone(),
        },
        None => outcome.output.clone(),
    }
}

/// Coordinates one engine run. All scheduling state lives here; spawned
/// tasks receive owned clones of whatever a provider invocation needs and
/// report back over `tx` — no mutex is shared across the coordinator and
/// its workers (§5: "single-writer discipline on the HistoryMap,
/// CheckStats, and routing bookkeeping").
struct Coordinator {
    config: Arc<Config>,
    providers: Arc<ProviderRegistry>,
    memory: Arc<MemoryStore>,
    pr_info: Arc<PrInfo>,
    project_root: PathBuf,
    current_event: String,

    plan: Plan,
    stack: Vec<WorkItem>,
    branches: BranchTracker,
    routing: RoutingController,
    wave: WaveTracker,
    history: HistoryMap,
    stats: HashMap<String, CheckStats>,
    issues: Vec<Issue>,
    failure_conditions: Vec<FailureConditionResult>,
    halted: bool,
    /// Cancelled the moment a `halt_execution` failure condition fires, so
    /// whatever provider invocation is already in flight on a spawned task
    /// is cut short instead of running to its natural completion (§4.6.4,
    /// §4.6.5 step 4).
    halt_token: CancellationToken,
    last_output: Option<Value>,
}

impl Coordinator {
    fn dependency_outputs_value(outputs: &HashMap<String, CheckOutput>) -> Value {
        serde_json::to_value(outputs.iter().map(|(k, v)| (k.clone(), v.as_scope_value())).collect::<HashMap<_, _>>())
            .unwrap_or(Value::Null)
    }

    fn build_scope<'s>(&'s self, dependency_outputs: &HashMap<String, CheckOutput>, item: &WorkItem) -> Scope<'s> {
        Scope::new(
            Self::dependency_outputs_value(dependency_outputs),
            &self.history,
            item.event.clone(),
            self.memory.snapshot_all(),
            self.memory.default_namespace().to_string(),
        )
    }

    /// §4.6.6: the wave-stats object bound to `forEach` inside an
    /// `onFinish` scope. `successful`/`failed` count iterations whose direct
    /// dependents (in `F`'s just-drained branch) all succeeded; an
    /// iteration with no direct dependents counts as successful.
    fn wave_stats(&self, check_id: &str, branch: &BranchPath, items: &[Value]) -> Value {
        let dependents = self.plan.direct_dependents(check_id);
        let total = items.len();
        let successful = (0..total)
            .filter(|&idx| {
                let child_branch = branch.push(check_id, idx);
                dependents
                    .iter()
                    .all(|dep| matches!(self.branches.get(dep, &child_branch), Some(o) if o.is_success()))
            })
            .count();
        serde_json::json!({
            "total": total,
            "successful": successful,
            "failed": total - successful,
            "items": items,
            "last_wave_size": total,
        })
    }

    fn check(&self, check_id: &str) -> &CheckConfig {
        &self.config.checks[check_id]
    }

    /// Flushes a [`Scope`]'s buffered `memory.*` writes to the real store
    /// (§4.3, §5: "committed at most once per provider invocation"). Every
    /// call site re-builds its scope from a fresh `snapshot_all()`, so a
    /// commit here is visible to the very next scope built on this
    /// coordinator thread.
    fn commit_scope(&self, scope: &Scope) {
        let writes = scope.take_pending_writes();
        if writes.is_empty() {
            return;
        }
        if let Err(e) = self.memory.commit_batch(writes) {
            warn!(error = %e, "memory write from sandboxed expression failed to commit");
        }
    }

    fn stats_for(&mut self, check_id: &str) -> &mut CheckStats {
        self.stats.entry(check_id.to_string()).or_insert_with(|| CheckStats::new(check_id))
    }

    /// Seeds the stack with every check that has no dependencies at all
    /// (plan level 0), root branch, loop 0.
    fn seed(&mut self) {
        let mut roots: Vec<String> = self.plan.levels.first().cloned().unwrap_or_default();
        roots.sort();
        for check_id in roots.into_iter().rev() {
            let work = WorkItem::new(check_id, self.current_event.clone());
            self.push_item(work);
        }
    }

    /// Main coordinator loop (§5): dispatch while under the parallelism
    /// cap, otherwise await the next completion.
    async fn drive(&mut self) {
        let max_parallelism = self.config.max_parallelism.max(1);
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let mut in_flight: usize = 0;

        loop {
            while !self.halted && in_flight < max_parallelism {
                let Some(item) = self.stack.pop() else { break };
                match self.evaluate_readiness(&item) {
                    Readiness::Skip(reason) => self.record_skip(item, reason),
                    Readiness::Ready { dependency_outputs, session_hint } => {
                        in_flight += 1;
                        self.dispatch(item, dependency_outputs, session_hint, tx.clone());
                    }
                }
            }

            if self.halted {
                self.apply_halt_to_stack();
            }

            if in_flight == 0 {
                break;
            }

            let Some(completion) = rx.recv().await else { break };
            in_flight -= 1;
            self.handle_completion(completion);
        }
    }

    /// Spawns the provider invocation (with its own retry loop and
    /// per-attempt timeout) as an independent task; the coordinator never
    /// awaits it directly, it waits on `rx` instead.
    fn dispatch(
        &self,
        item: WorkItem,
        dependency_outputs: HashMap<String, CheckOutput>,
        session_hint: Option<SessionHint>,
        tx: mpsc::UnboundedSender<Completion>,
    ) {
        let check = self.check(&item.check_id).clone();
        let providers = Arc::clone(&self.providers);
        let memory = Arc::clone(&self.memory);
        let pr_info = Arc::clone(&self.pr_info);
        let project_root = self.project_root.clone();
        let history_snapshot = self.history.clone();
        let mut work = item;
        work.session_hint = session_hint.or(work.session_hint);

        tokio::spawn(async move {
            let outcome = execute_with_retries(&check, &providers, &memory, &pr_info, &project_root, &history_snapshot, &work, &dependency_outputs).await;
            let _ = tx.send(Completion { item: work, dependency_outputs, outcome });
        });
    }

    /// §4.6.3: dependency status, ANY-OF gating, then `if`.
    fn evaluate_readiness(&self, item: &WorkItem) -> Readiness {
        let check = self.check(&item.check_id);
        let mut dependency_outputs = HashMap::new();
        let mut session_hint: Option<SessionHint> = None;
        let mut hard_failed = false;
        let mut any_skipped = false;

        for dep in self.plan.direct_dependencies(&item.check_id) {
            match dep {
                ResolvedDependency::Single(dep_id) => {
                    let branch = dependency_branch(dep_id, &item.branch_path);
                    let Some(outcome) = self.branches.get(dep_id, &branch) else {
                        any_skipped = true;
                        continue;
                    };
                    dependency_outputs.insert(dep_id.clone(), dependency_output_for_branch(dep_id, &item.branch_path, outcome));
                    if let Some(hint) = &outcome.session_hint {
                        session_hint = Some(hint.clone());
                    }
                    match outcome.status {
                        BranchStatus::Success => {}
                        BranchStatus::Failed | BranchStatus::Skipped if check.continue_on_failure => {}
                        BranchStatus::Failed => hard_failed = true,
                        BranchStatus::Skipped => any_skipped = true,
                    }
                }
                ResolvedDependency::AnyOf(members) => {
                    let mut satisfied = false;
                    for member in members {
                        let branch = dependency_branch(member, &item.branch_path);
                        if let Some(outcome) = self.branches.get(member, &branch) {
                            dependency_outputs.insert(member.clone(), dependency_output_for_branch(member, &item.branch_path, outcome));
                            if outcome.is_success() {
                                satisfied = true;
                                if let Some(hint) = &outcome.session_hint {
                                    session_hint = Some(hint.clone());
                                }
                            }
                        }
                    }
                    if !satisfied && !check.continue_on_failure {
                        hard_failed = true;
                    }
                }
            }
        }

        if hard_failed {
            return Readiness::Skip(SkipReason::DependencyFailed);
        }
        if any_skipped {
            return Readiness::Skip(SkipReason::DependencySkipped);
        }

        if let Some(if_expr) = &check.if_expr {
            let scope = self.build_scope(&dependency_outputs, item);
            let sandbox = Sandbox::new();
            let result = sandbox.evaluate(if_expr, &scope);
            self.commit_scope(&scope);
            match result {
                Ok(v) if is_truthy(&v) => {}
                Ok(_) => return Readiness::Skip(SkipReason::IfFalse),
                Err(e) => {
                    warn!(check_id = %item.check_id, error = %e, "'if' predicate failed to evaluate; skipping");
                    return Readiness::Skip(SkipReason::IfFalse);
                }
            }
        }

        Readiness::Ready { dependency_outputs, session_hint }
    }

    /// Records a skip without ever dispatching a provider: zero runs,
    /// `skipReason` set, dependents re-evaluated immediately (§4.6.3).
    fn record_skip(&mut self, item: WorkItem, reason: SkipReason) {
        debug!(check_id = %item.check_id, branch = %item.branch_path.label(), ?reason, "check skipped");
        self.stats_for(&item.check_id).record_skip(reason);
        self.branches.record(&item.check_id, item.branch_path.clone(), BranchOutcome::skipped(reason));
        self.drain_wave_membership(&item);
        self.push_ready_dependents(&item.check_id, &item.branch_path, item.loop_count, None);
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion { item, dependency_outputs, outcome } = completion;
        let check = self.check(&item.check_id).clone();

        let (success, duration_ms, issues, output, session_hint) = match outcome {
            RunOutcome::Ok { summary, duration_ms } => {
                let session_hint = summary.session_id.as_ref().map(|id| SessionHint {
                    parent_session_id: Some(id.clone()),
                    reuse_mode: ReuseMode::Clone,
                });
                let (success, issues) = self.finish_run(&item, &dependency_outputs, summary, duration_ms);
                let output = self.last_output.clone().unwrap_or(Value::Null);
                (success, duration_ms, issues, output, session_hint)
            }
            RunOutcome::Err { message, rule_id, duration_ms } => {
                let issue = Issue::system(rule_id, message, Severity::Error).tagged_for(&item.check_id);
                (false, duration_ms, vec![issue], Value::Null, None)
            }
        };

        self.stats_for(&item.check_id).record_run(success, duration_ms, issues.len());
        self.issues.extend(issues.clone());
        self.history.append(&item.check_id, output.clone(), item.loop_idx());

        let for_each_items = if check.for_each && success { output.as_array().map(|a| a.to_vec()) } else { None };
        let outcome = BranchOutcome {
            status: if success { BranchStatus::Success } else { BranchStatus::Failed },
            skip_reason: None,
            output: CheckOutput::Value(output.clone()),
            session_hint: session_hint.clone(),
            for_each_items: for_each_items.clone(),
        };
        self.branches.record(&item.check_id, item.branch_path.clone(), outcome);

        self.route(&item, success, &output, session_hint);
        self.push_ready_dependents(&item.check_id, &item.branch_path, item.loop_count, for_each_items.as_deref());
        self.drain_wave_membership(&item);
    }

    /// §4.6.4 step 1-3: `transform`/`transform_js`, `fail_if`,
    /// `failure_conditions`.
    fn finish_run(
        &mut self,
        item: &WorkItem,
        dependency_outputs: &HashMap<String, CheckOutput>,
        mut summary: ReviewSummary,
        _duration_ms: u64,
    ) -> (bool, Vec<Issue>) {
        let check = self.check(&item.check_id).clone();
        let sandbox = Sandbox::new();

        if let Some(script) = &check.transform_js {
            let scope = self.build_scope(dependency_outputs, item).with_own_output(summary.output.clone().unwrap_or(Value::Null));
            let result = sandbox.evaluate_script(script, &scope);
            self.commit_scope(&scope);
            match result {
                Ok(v) => summary.output = Some(v),
                Err(e) => summary
                    .issues
                    .push(Issue::system("sandbox/execution-error", format!("transform_js failed: {e}"), Severity::Error)),
            }
        } else if let Some(expr) = &check.transform {
            let scope = self.build_scope(dependency_outputs, item).with_own_output(summary.output.clone().unwrap_or(Value::Null));
            let result = sandbox.evaluate(expr, &scope);
            self.commit_scope(&scope);
            match result {
                Ok(v) => summary.output = Some(v),
                Err(e) => summary
                    .issues
                    .push(Issue::system("sandbox/execution-error", format!("transform failed: {e}"), Severity::Error)),
            }
        }

        let own_output = summary.output.clone().unwrap_or(Value::Null);
        let mut success = true;

        if let Some(expr) = &check.fail_if {
            let scope = self.build_scope(dependency_outputs, item).with_own_output(own_output.clone());
            let result = sandbox.evaluate(expr, &scope);
            self.commit_scope(&scope);
            match result {
                Ok(v) if is_truthy(&v) => {
                    success = false;
                    summary
                        .issues
                        .push(Issue::system("fail_if", format!("fail_if '{expr}' evaluated to true"), Severity::Error));
                }
                Ok(_) => {}
                Err(e) => summary.issues.push(Issue::system(
                    "sandbox/execution-error",
                    format!("fail_if failed to evaluate: {e}"),
                    Severity::Error,
                )),
            }
        }

        for (name, spec) in &check.failure_conditions {
            let scope = self.build_scope(dependency_outputs, item).with_own_output(own_output.clone());
            let eval_result = sandbox.evaluate(&spec.condition, &scope);
            self.commit_scope(&scope);
            let fired = match eval_result {
                Ok(v) => is_truthy(&v),
                Err(e) => {
                    summary.issues.push(Issue::system(
                        "sandbox/execution-error",
                        format!("failure_condition '{name}' failed to evaluate: {e}"),
                        Severity::Error,
                    ));
                    false
                }
            };
            self.failure_conditions.push(FailureConditionResult {
                condition_name: name.clone(),
                failed: fired,
                severity: spec.severity,
                expression: spec.condition.clone(),
                message: spec.message.clone(),
                halt_execution: spec.halt_execution,
            });
            if fired {
                success = false;
                if spec.halt_execution {
                    self.halted = true;
                }
            }
        }

        let issues: Vec<Issue> = summary.issues.iter().cloned().map(|i| i.tagged_for(&item.check_id)).collect();
        self.last_output = Some(own_output);
        (success, issues)
    }

    /// §4.6.5: `on_success`/`on_fail` — `run`/`run_js` then `goto`/`goto_js`.
    fn route(&mut self, item: &WorkItem, success: bool, output: &Value, session_hint: Option<SessionHint>) {
        if self.halted {
            return;
        }
        let check = self.check(&item.check_id);
        let action = if success { check.on_success.clone() } else { check.on_fail.clone() };
        let Some(action) = action else { return };

        for run_id in &action.run {
            if self.plan.is_included(run_id) {
                self.enqueue_run(run_id, item, session_hint.clone());
            }
        }

        if let Some(script) = &action.run_js {
            let scope = self.build_scope(&HashMap::new(), item).with_own_output(output.clone());
            let sandbox = Sandbox::new();
            let result = sandbox.evaluate_script(script, &scope);
            self.commit_scope(&scope);
            if let Ok(Value::Array(ids)) = result {
                for id in ids.into_iter().filter_map(|v| v.as_str().map(str::to_string)) {
                    if self.plan.is_included(&id) {
                        self.enqueue_run(&id, item, session_hint.clone());
                    }
                }
            }
        }

        self.apply_goto(item, &action, output, None, None);
    }

    fn enqueue_run(&mut self, run_id: &str, from: &WorkItem, session_hint: Option<SessionHint>) {
        let mut work = WorkItem::new(run_id, from.event.clone()).with_branch(from.branch_path.clone()).with_loop_count(from.loop_count);
        work.session_hint = session_hint;
        self.try_resolve_and_push(work);
    }

    /// Resolves `goto`/`goto_js`, validates the target is an ancestor, and
    /// re-enqueues it with an incremented loop count (§4.6.5 step 3, §4.7).
    /// `override_event` lets `onFinish.goto_event` replace the event name
    /// on the routed branch (§4.6.6 step 4). `on_finish_scope`, when
    /// present, binds the §4.6.6 `forEach`/`step`/`attempt`/`loop`
    /// identifiers for the duration of this evaluation.
    fn apply_goto(
        &mut self,
        item: &WorkItem,
        action: &RoutingAction,
        output: &Value,
        override_event: Option<&str>,
        on_finish_scope: Option<(Value, Value, Value, Value)>,
    ) {
        if action.goto.is_none() && action.goto_js.is_none() {
            return;
        }
        let target = if let Some(script) = &action.goto_js {
            let mut scope = self.build_scope(&HashMap::new(), item).with_own_output(output.clone());
            if let Some((for_each, step, attempt, loop_idx)) = on_finish_scope {
                scope = scope.with_on_finish(for_each, step, attempt, loop_idx);
            }
            let sandbox = Sandbox::new();
            let result = sandbox.evaluate_script(script, &scope);
            self.commit_scope(&scope);
            match result {
                Ok(Value::String(s)) => Some(s),
                Ok(_) => None,
                Err(e) => {
                    warn!(check_id = %item.check_id, error = %e, "goto_js failed; falling back to static goto");
                    action.goto.clone()
                }
            }
        } else {
            action.goto.clone()
        };

        let Some(target) = target else { return };
        if !RoutingController::is_ancestor(&self.plan, &item.check_id, &target) {
            warn!(check_id = %item.check_id, target = %target, "goto target is not an ancestor; ignoring");
            return;
        }

        let max_loops = self.check(&target).max_loops;
        let next_loop = self.routing.increment(&target);
        if next_loop >= max_loops {
            self.issues.push(Issue::system(
                "routing/max_loops",
                format!("check '{target}' exceeded max_loops={max_loops}"),
                Severity::Error,
            ));
            return;
        }

        self.branches.clear_descendants(&item.branch_path);
        let mut work = WorkItem::new(target, override_event.map(str::to_string).unwrap_or_else(|| item.event.clone()))
            .with_branch(item.branch_path.clone())
            .with_loop_count(next_loop);
        work.session_hint = item.session_hint.clone();
        self.push_item(work);
    }

    /// Pushes onto the LIFO stack so that, under `max_parallelism: 1`, a
    /// branch's entire descendant chain finishes before the next sibling
    /// branch starts (§4.6.2 branch-first ordering, S1).
    fn push_item(&mut self, item: WorkItem) {
        if self.halted {
            self.stats_for(&item.check_id).record_skip(SkipReason::HaltedByCondition);
            self.branches.record(&item.check_id, item.branch_path.clone(), BranchOutcome::skipped(SkipReason::HaltedByCondition));
            return;
        }
        self.enter_wave_for(&item);
        self.stack.push(item);
    }

    fn wave_key_for(&self, branch: &BranchPath) -> Option<WaveKey> {
        let (ancestor_id, _) = branch.0.last()?;
        Some(WaveKey {
            check_id: ancestor_id.clone(),
            branch: BranchPath(branch.0[..branch.0.len() - 1].to_vec()),
            loop_idx: self.routing.loop_count(ancestor_id),
        })
    }

    fn enter_wave_for(&mut self, item: &WorkItem) {
        if let Some(key) = self.wave_key_for(&item.branch_path) {
            self.wave.enter(&key);
        }
    }

    fn drain_wave_membership(&mut self, item: &WorkItem) {
        if let Some(key) = self.wave_key_for(&item.branch_path) {
            if self.wave.leave(&key) {
                self.fire_on_finish(&key.check_id, &key.branch, key.loop_idx);
            }
        }
    }

    /// Pushes every direct dependent of `check_id` whose readiness is now
    /// decidable: fanned out across `for_each_items` when present (§4.6.2),
    /// otherwise a single WorkItem in the same branch.
    fn push_ready_dependents(&mut self, check_id: &str, branch: &BranchPath, loop_count: u32, for_each_items: Option<&[Value]>) {
        let dependents = self.plan.direct_dependents(check_id).to_vec();
        for dependent_id in dependents.iter().rev() {
            match for_each_items {
                Some(items) => {
                    for (idx, item_value) in items.iter().enumerate().rev() {
                        let child_branch = branch.push(check_id, idx);
                        let work = WorkItem::new(dependent_id.clone(), self.current_event.clone())
                            .with_branch(child_branch)
                            .with_loop_count(loop_count)
                            .with_iteration_item(item_value.clone());
                        self.try_resolve_and_push(work);
                    }
                }
                None => {
                    let work = WorkItem::new(dependent_id.clone(), self.current_event.clone())
                        .with_branch(branch.clone())
                        .with_loop_count(loop_count);
                    self.try_resolve_and_push(work);
                }
            }
        }
    }

    /// A dependent only becomes a genuine candidate once every one of its
    /// dependencies has recorded an outcome in the corresponding branch;
    /// until then this is a no-op — the next sibling dependency's
    /// completion retries it.
    fn try_resolve_and_push(&mut self, work: WorkItem) {
        for dep in self.plan.direct_dependencies(&work.check_id) {
            for member in dep.members() {
                let dep_branch = dependency_branch(member, &work.branch_path);
                if self.branches.get(member, &dep_branch).is_none() {
                    return;
                }
            }
        }
        self.push_item(work);
    }

    /// §4.6.6: fires `onFinish` once per loop of a drained forEach wave.
    fn fire_on_finish(&mut self, check_id: &str, branch: &BranchPath, loop_idx: u32) {
        let Some(action) = self.check(check_id).on_finish.clone() else { return };
        let Some(own_outcome) = self.branches.get(check_id, branch).cloned() else { return };
        let Some(items) = &own_outcome.for_each_items else { return };
        if items.is_empty() {
            return;
        }

        let synthetic = WorkItem::new(check_id.to_string(), self.current_event.clone()).with_branch(branch.clone()).with_loop_count(loop_idx);
        let own_value = own_outcome.output.as_scope_value();

        let check = self.check(check_id);
        let step_val = serde_json::json!({ "id": check_id, "tags": check.tags.clone(), "group": check.group.clone() });
        let attempt_val = Value::from(loop_idx);
        let for_each_val = self.wave_stats(check_id, branch, items);

        for run_id in &action.run {
            if self.plan.is_included(run_id) {
                self.enqueue_run(run_id, &synthetic, None);
            }
        }
        if let Some(script) = &action.run_js {
            let scope = self
                .build_scope(&HashMap::new(), &synthetic)
                .with_own_output(own_value.clone())
                .with_on_finish(for_each_val.clone(), step_val.clone(), attempt_val.clone(), attempt_val.clone());
            let sandbox = Sandbox::new();
            let result = sandbox.evaluate_script(script, &scope);
            self.commit_scope(&scope);
            if let Ok(Value::Array(ids)) = result {
                for id in ids.into_iter().filter_map(|v| v.as_str().map(str::to_string)) {
                    if self.plan.is_included(&id) {
                        self.enqueue_run(&id, &synthetic, None);
                    }
                }
            }
        }

        let goto_event = action.goto_event.clone();
        self.apply_goto(
            &synthetic,
            &action,
            &own_value,
            goto_event.as_deref(),
            Some((for_each_val, step_val, attempt_val.clone(), attempt_val)),
        );
    }

    /// §4.6.5 step 4 / §7: once halted, everything still waiting on the
    /// stack is recorded as skipped rather than executed.
    fn apply_halt_to_stack(&mut self) {
        for item in self.stack.drain(..) {
            self.stats_for(&item.check_id).record_skip(SkipReason::HaltedByCondition);
            self.branches.record(&item.check_id, item.branch_path.clone(), BranchOutcome::skipped(SkipReason::HaltedByCondition));
        }
    }
}

/// Runs the provider, honoring `retry` (bounded re-attempts of the same
/// WorkItem, never touching `loopCount`, §4.7) and the per-check timeout
/// (§4.6.4). Lives outside `Coordinator` since it executes on a spawned
/// task with only owned/Arc'd inputs.
async fn execute_with_retries(
    check: &CheckConfig,
    providers: &ProviderRegistry,
    memory: &MemoryStore,
    pr_info: &PrInfo,
    project_root: &std::path::Path,
    history: &HistoryMap,
    item: &WorkItem,
    dependency_outputs: &HashMap<String, CheckOutput>,
) -> RunOutcome {
    let retry = check.retry.unwrap_or_default();
    let mut last = RunOutcome::Err { message: "no attempt made".to_string(), rule_id: "provider/execution_error", duration_ms: 0 };

    for attempt in 0..retry.max_attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(retry.delay_for(attempt)).await;
        }
        last = execute_once(check, providers, memory, pr_info, project_root, history, item, dependency_outputs).await;
        if matches!(last, RunOutcome::Ok { .. }) {
            break;
        }
    }
    last
}

async fn execute_once(
    check: &CheckConfig,
    providers: &ProviderRegistry,
    memory: &MemoryStore,
    pr_info: &PrInfo,
    project_root: &std::path::Path,
    history: &HistoryMap,
    item: &WorkItem,
    dependency_outputs: &HashMap<String, CheckOutput>,
) -> RunOutcome {
    let ctx = ProviderContext {
        pr_info,
        config: check,
        dependency_outputs,
        session_hint: item.session_hint.as_ref(),
        memory,
        project_root,
        event: &item.event,
        iteration_item: item.iteration_item.as_ref(),
        history,
        loop_idx: item.loop_idx(),
    };

    let start = Instant::now();
    let timeout = Duration::from_millis(check.timeout_ms);
    match tokio::time::timeout(timeout, providers.execute(&check.check_type, &ctx)).await {
        Ok(Ok(summary)) => RunOutcome::Ok { summary, duration_ms: start.elapsed().as_millis() as u64 },
        Ok(Err(e)) => RunOutcome::Err {
            message: e.to_string(),
            rule_id: "provider/execution_error",
            duration_ms: start.elapsed().as_millis() as u64,
        },
        Err(_) => RunOutcome::Err {
            message: format!("check '{}' exceeded {}ms", item.check_id, check.timeout_ms),
            rule_id: "provider/timeout",
            duration_ms: start.elapsed().as_millis() as u64,
        },
    }
}
