// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidStageTransition { from: String, to: String },

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid concurrency: {0} (must be 1-20)")]
    InvalidConcurrency(usize),

    #[error("Invalid window size: {0} (must be >= 1)")]
    InvalidWindowSize(usize),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
