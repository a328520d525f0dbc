use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprErrorKind {
    Syntax,
    Runtime,
    Timeout,
    Forbidden,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ExprError {
    pub kind: ExprErrorKind,
    pub message: String,
}

impl ExprError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: ExprErrorKind::Syntax,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ExprErrorKind::Runtime,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ExprErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            kind: ExprErrorKind::Forbidden,
            message: message.into(),
        }
    }
}
