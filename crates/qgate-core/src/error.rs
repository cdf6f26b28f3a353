use std::path::PathBuf;

use thiserror::Error;

/// Lifecycle misuse. Always a caller bug, so always surfaced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is stopped; cannot record")]
    SessionStopped,

    #[error("Session already stopped")]
    AlreadyStopped,
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Summary not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid summary JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} threshold violation(s): {}", .0.len(), .0.join("; "))]
pub struct ThresholdError(pub Vec<String>);

pub type Result<T> = std::result::Result<T, SessionError>;
