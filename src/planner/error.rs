use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("config/unknown_dependency: '{check_id}' depends on unknown check '{dependency}'")]
    UnknownDependency { check_id: String, dependency: String },

    #[error("config/cycle: dependency cycle detected: {0:?}")]
    Cycle(Vec<String>),
}
