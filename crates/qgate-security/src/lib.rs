//! Redaction pipeline for captured command text
//!
//! This crate contains:
//! - The `Redact` capability and the caller-ordered `Pipeline`
//! - Built-in rule families (PII, secrets, identifiers, network/time noise)
//! - `SafeRegex`, the bounded regex wrapper every pattern compiles through

pub mod error;
pub mod pipeline;
pub mod redactor;
pub mod rules;
pub mod safe_regex;

pub use error::{RedactError, Result};
pub use pipeline::Pipeline;
pub use redactor::{PatternRedactor, Redact, Rule, WhitespaceNormalizer};
pub use safe_regex::{Engine, MatchLimitExceeded, SafeRegex};
