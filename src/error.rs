//! Crate-wide error type.
//!
//! Variant names map directly onto the `ruleId` prefixes used when an error
//! is surfaced as a synthetic [`crate::domain::Issue`]: `config/*`,
//! `provider/timeout`, `provider/execution_error`, `sandbox/*`,
//! `routing/max_loops`, `dependency/failed`, `dependency/skipped`, `halt`.

use thiserror::Error;

use crate::sandbox::ExprErrorKind;

#[derive(Debug, Error)]
pub enum VisorError {
    #[error("config/{kind}: {message}")]
    Config { kind: String, message: String },

    #[error("provider/timeout: check '{check_id}' exceeded {timeout_ms}ms")]
    ProviderTimeout { check_id: String, timeout_ms: u64 },

    #[error("provider/execution_error: check '{check_id}': {message}")]
    ProviderExecution { check_id: String, message: String },

    #[error("sandbox/{kind:?}: {message}")]
    Sandbox { kind: ExprErrorKind, message: String },

    #[error("routing/max_loops: check '{check_id}' exceeded max_loops={max_loops}")]
    RoutingMaxLoops { check_id: String, max_loops: u32 },

    #[error("dependency/failed: '{dependency}' failed for '{check_id}'")]
    DependencyFailed { check_id: String, dependency: String },

    #[error("dependency/skipped: '{dependency}' was skipped for '{check_id}'")]
    DependencySkipped { check_id: String, dependency: String },

    #[error("halt: {condition_name}: {message}")]
    Halt { condition_name: String, message: String },
}

impl VisorError {
    /// The `ruleId` prefix a synthetic issue built from this error should use.
    pub fn rule_id(&self) -> String {
        match self {
            Self::Config { kind, .. } => format!("config/{kind}"),
            Self::ProviderTimeout { .. } => "provider/timeout".to_string(),
            Self::ProviderExecution { .. } => "provider/execution_error".to_string(),
            Self::Sandbox { .. } => "sandbox/execution-error".to_string(),
            Self::RoutingMaxLoops { .. } => "routing/max_loops".to_string(),
            Self::DependencyFailed { .. } => "dependency/failed".to_string(),
            Self::DependencySkipped { .. } => "dependency/skipped".to_string(),
            Self::Halt { .. } => "halt".to_string(),
        }
    }
}

pub type VisorResult<T> = Result<T, VisorError>;
