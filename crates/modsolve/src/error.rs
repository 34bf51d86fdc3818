use std::path::PathBuf;

use thiserror::Error;

use crate::option::OptionId;

#[derive(Error, Debug)]
pub enum ResolveError {
    // Discovery errors (recovered locally)
    #[error("Option {identity} from {source_name} was already registered as #{existing}")]
    DuplicateOption {
        identity: String,
        source_name: String,
        existing: OptionId,
    },

    #[error("Override for {path} references {kind} clause {clause} which {identity} does not declare")]
    OverrideMismatch {
        path: String,
        identity: String,
        kind: &'static str,
        clause: String,
    },

    #[error("Failed to scan {location}: {reason}")]
    Scan { location: String, reason: String },

    #[error("Option #{0} is not registered")]
    UnknownOption(OptionId),

    // Solver errors
    #[error("Internal solver fault: {0}")]
    InternalSolverFault(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid override file {}: {reason}", path.display())]
    InvalidOverrides { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResolveError {
    /// Whether discovery may log this error and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ResolveError::DuplicateOption { .. }
                | ResolveError::OverrideMismatch { .. }
                | ResolveError::Scan { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
