//! Visor - dependency-graph pipeline engine for AI-assisted code review and
//! automation checks.
//!
//! A pipeline is a YAML document of named checks wired into a DAG by
//! `depends_on`. The engine plans the DAG into topological levels, walks it
//! with bounded parallelism, evaluates each check's readiness
//! (dependencies, ANY-OF groups, `if`), runs its provider, applies
//! `fail_if`/`failure_conditions`/transform, routes to `on_success`/
//! `on_fail`/`on_finish`, and hands the accumulated issues and statistics
//! to the aggregator for a final report.
//!
//! # Modules
//!
//! - [`config`] - Configuration Model: the typed pipeline document
//! - [`domain`] - Core data model shared across the engine
//! - [`planner`] - Dependency Planner: DAG construction and topological levels
//! - [`sandbox`] - Expression Sandbox: `if`/`fail_if`/`transform_js`/`goto_js`
//! - [`template`] - Template Engine: provider parameter rendering
//! - [`memory`] - Memory Store: namespaced key/value state across checks
//! - [`providers`] - Provider Registry & Contract: check execution surface
//! - [`scheduler`] - Scheduler / Execution Engine and Routing & Retry Controller
//! - [`aggregator`] - Result Aggregator: issue tagging, grouping, and reports
//! - [`error`] - Crate-wide error type

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod memory;
pub mod planner;
pub mod providers;
pub mod sandbox;
pub mod scheduler;
pub mod template;

pub use config::Config;
pub use domain::{ExecutionReport, TriggerEvent};
pub use error::{VisorError, VisorResult};
pub use memory::MemoryStore;
pub use planner::{build_plan, Plan, TagFilter};
pub use providers::{PrInfo, ProviderRegistry};
pub use scheduler::{Engine, EngineOutput, RunRequest};

use std::path::PathBuf;

/// Runs one full pipeline pass: plan, schedule, aggregate.
///
/// Convenience wrapper over [`Engine::run`] + [`aggregator::aggregate`] for
/// callers (the CLI, embedders) that don't need the intermediate
/// [`EngineOutput`].
pub async fn run_pipeline(
    config: Config,
    providers: ProviderRegistry,
    project_root: impl Into<PathBuf>,
    request: RunRequest,
) -> VisorResult<ExecutionReport> {
    let memory = MemoryStore::new(config.memory.clone());
    let output_config = config.output.clone();
    let engine = Engine::new(config, providers, memory, project_root);
    let output = engine.run(request).await?;
    Ok(aggregator::aggregate(output, &output_config))
}
