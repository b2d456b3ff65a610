//! Error types for schedulr
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (invalid task data, unknown rule or sort key, missing task)
//! - 4: Operation failed (file system or JSON failure)

use thiserror::Error;

use crate::models::TaskId;

/// Exit codes for the schedulr CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for schedulr operations
#[derive(Error, Debug)]
pub enum Error {
    /// Task data rejected at creation or edit time.
    #[error("Invalid task: {0}")]
    Validation(String),

    /// Unknown recurrence type, sort key or other closed-set value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::Configuration(_)
            | Error::DateOutOfRange(_)
            | Error::TaskNotFound(_) => exit_codes::USER_ERROR,

            Error::Io(_) | Error::Json(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for schedulr operations
pub type Result<T> = std::result::Result<T, Error>;
