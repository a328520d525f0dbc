use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("TypeError: key '{key}' in namespace '{namespace}' is not numeric")]
    NotNumeric { namespace: String, key: String },

    #[error("memory snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory snapshot json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("memory snapshot csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no snapshot file configured")]
    NoFileConfigured,
}
