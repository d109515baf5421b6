//! Error types for command execution

use std::process::ExitStatus;

use thiserror::Error;

/// Command execution errors
///
/// `command` fields always hold the masked rendering, never real secrets.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{message} ({status})")]
    Failed {
        message: String,
        command: String,
        status: ExitStatus,
    },

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential resolution failed: {message}")]
    Credentials { message: String },
}

impl ExecError {
    /// Exit code of the external process, when it ran and exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Failed { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Result type for execution
pub type Result<T> = std::result::Result<T, ExecError>;
