//! Core domain models for qgate
//!
//! This crate contains:
//! - The capture session and its lifecycle (`Session`, `Options`, `Event`)
//! - The immutable `Report` snapshot and its derived statistics
//! - The versioned JSON `Summary` document
//! - Numeric thresholds shared with the CI gate

pub mod error;
pub mod event;
pub mod options;
pub mod report;
pub mod session;
pub mod summary;
pub mod thresholds;

pub use error::{Result, SessionError, SummaryError, ThresholdError};
pub use event::{Event, Metadata};
pub use options::{CaptureSource, Options, OptionsBuilder, SourceOverrides};
pub use report::Report;
pub use session::{Lifecycle, Session};
pub use summary::{SCHEMA_VERSION, Summary, SummaryEvent};
pub use thresholds::{EPSILON, Metric, ThresholdFinding, Thresholds, Totals};
