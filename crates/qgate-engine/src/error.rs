//! Error types for qgate-engine

use thiserror::Error;

/// A `--budget` value that could not be understood. Always carries the
/// offending spec verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetParseError {
    #[error("Invalid budget '{spec}': expected <pattern>=<max>")]
    MissingMax { spec: String },

    #[error("Invalid budget '{spec}': max '{max}' is not a non-negative integer")]
    InvalidMax { spec: String, max: String },

    #[error("Invalid budget '{spec}': pattern is empty")]
    EmptyPattern { spec: String },

    #[error("Invalid budget '{spec}': {reason}")]
    InvalidRegex { spec: String, reason: String },
}
