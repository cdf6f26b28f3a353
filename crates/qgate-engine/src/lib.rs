//! Multi-file aggregation and the CI gate for qgate
//!
//! Loads nothing itself: callers hand in parsed [`qgate_core::Summary`]
//! documents, get an [`Aggregate`], evaluate it against a [`GatePolicy`] and
//! render the resulting [`Evaluation`] as Markdown.

pub mod aggregate;
pub mod budget;
pub mod error;
pub mod gate;
pub mod render;

pub use aggregate::Aggregate;
pub use budget::PatternBudget;
pub use error::BudgetParseError;
pub use gate::{
    BaselineComparison, BaselinePolicy, BaselineRow, Decision, Evaluation, GatePolicy,
    PatternFinding, evaluate,
};
pub use render::render_markdown;
