//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart directory not readable: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Failed to parse {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Cannot rewrite {field} of dependency '{dependency}' in {path}: {reason}")]
    Patch {
        path: PathBuf,
        dependency: String,
        field: &'static str,
        reason: String,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from walking the chart tree
    pub fn is_scan_error(&self) -> bool {
        matches!(
            self,
            CoreError::RootNotFound { .. } | CoreError::Scan { .. } | CoreError::InvalidPattern { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
