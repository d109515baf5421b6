//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chartsmith_core::CoreError;
use chartsmith_exec::ExecError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Missing or invalid settings
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartsmith::cli::config))]
    Configuration {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Walking the chart tree failed
    #[error("Scan failed: {message}")]
    #[diagnostic(code(chartsmith::cli::scan))]
    Scan { message: String },

    /// Chart.yaml could not be read or parsed
    #[error("Chart error: {message}")]
    #[diagnostic(code(chartsmith::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartsmith::cli::io))]
    Io { message: String },

    /// helm failed or could not be started
    #[error("{message}")]
    #[diagnostic(code(chartsmith::cli::exec))]
    Execution {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration { .. } => exit_codes::CONFIG_ERROR,
            CliError::Scan { .. } => exit_codes::SCAN_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Execution { .. } => exit_codes::EXEC_ERROR,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_scan_error() => CliError::Scan { message },
            CoreError::Configuration { .. } => CliError::Configuration {
                message,
                help: Some(
                    "pass --override-repository (or set overrideRepository in the config file)"
                        .to_string(),
                ),
            },
            CoreError::DescriptorParse { .. } => CliError::Chart {
                message,
                help: Some("check that Chart.yaml is valid YAML with apiVersion, name and version".to_string()),
            },
            CoreError::Patch { .. } => CliError::Chart {
                message,
                help: Some(
                    "write each dependency field on its own line in block style".to_string(),
                ),
            },
            _ => CliError::Io { message },
        }
    }
}

impl From<ExecError> for CliError {
    fn from(err: ExecError) -> Self {
        let help = match &err {
            ExecError::Spawn { .. } => {
                Some("is helm installed? point --helm or CHARTSMITH_HELM at the executable".to_string())
            }
            ExecError::Failed { command, .. } => Some(format!("command was: {}", command)),
            _ => None,
        };

        let message = err.to_string();
        match err {
            ExecError::Credentials { .. } => CliError::Configuration {
                message,
                help: None,
            },
            _ => CliError::Execution { message, help },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
