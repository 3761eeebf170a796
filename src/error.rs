//! Error types for wbs
//!
//! Exit codes:
//! - 0: Success
//! - 2: Validation error (bad args, rejected edit, bad config)
//! - 3: Referenced project or task does not exist
//! - 4: Operation failed (I/O, lock timeout, broken tree invariant)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the wbs CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for wbs operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Project code already exists: {0}")]
    DuplicateProjectCode(String),

    #[error("Task {task} is a summary task; {field} is derived from its children")]
    SummaryTaskReadOnly { task: String, field: &'static str },

    // Missing records (exit code 3)
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error("Hierarchy invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::DuplicateProjectCode(_)
            | Error::SummaryTaskReadOnly { .. } => exit_codes::USER_ERROR,

            Error::ProjectNotFound(_) | Error::TaskNotFound(_) => exit_codes::NOT_FOUND,

            Error::Invariant(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Short machine-readable classification used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Invariant(_) => "internal_error",
            _ => match self.exit_code() {
                exit_codes::USER_ERROR => "validation_error",
                exit_codes::NOT_FOUND => "not_found",
                _ => "operation_failed",
            },
        }
    }

    /// Build an invariant error and log it; these indicate a corrupted tree.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "hierarchy invariant violated");
        Error::Invariant(message)
    }
}

/// Result type alias for wbs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
        }
    }
}
