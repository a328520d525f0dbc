use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider/execution_error: {0}")]
    Execution(String),

    #[error("provider/timeout")]
    Timeout,

    #[error("provider/unknown_type: '{0}'")]
    UnknownType(String),
}
