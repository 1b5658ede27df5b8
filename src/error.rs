//! Error types for taskdb
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, duplicate uuid, bad config)
//! - 3: Blocked (read-only data file, lock contention)
//! - 4: Operation failed (corrupt data, I/O failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskdb CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdb operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cannot add task because the uuid '{0}' is not unique")]
    DuplicateUuid(String),

    // Blocked (exit code 3)
    #[error("Data file is read-only: {0}")]
    ReadOnly(PathBuf),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    // Operation failures (exit code 4)
    #[error("{reason} in {} at line {line}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid task record: {0}")]
    InvalidTask(String),

    #[error("Cannot access {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::DuplicateUuid(_) => exit_codes::USER_ERROR,

            Error::ReadOnly(_) | Error::LockFailed(_) => exit_codes::BLOCKED,

            Error::Parse { .. }
            | Error::InvalidTask(_)
            | Error::Unavailable { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        use serde_json::json;

        match self {
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(json!({ "message": message }))
            }
            Error::TaskNotFound(key) => Some(json!({ "task": key })),
            Error::DuplicateUuid(uuid) => Some(json!({ "uuid": uuid })),
            Error::ReadOnly(path) | Error::LockFailed(path) => {
                Some(json!({ "path": path.to_string_lossy() }))
            }
            Error::Parse { path, line, reason } => Some(json!({
                "path": path.to_string_lossy(),
                "line": line,
                "reason": reason,
            })),
            Error::Unavailable { path, .. } => Some(json!({ "path": path.to_string_lossy() })),
            _ => None,
        }
    }
}

/// Result type alias for taskdb operations
pub type Result<T> = std::result::Result<T, Error>;
