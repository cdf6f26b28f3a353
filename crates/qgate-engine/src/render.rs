//! Markdown report
//!
//! Pure formatting over an [`Aggregate`] and its [`Evaluation`]. Runs on
//! failure paths too, so it never fails and never re-evaluates.

use qgate_core::Metric;

use crate::aggregate::Aggregate;
use crate::gate::{Decision, Evaluation};

const PASS: &str = "✓ pass";
const FAIL: &str = "✗ fail";

pub fn render_markdown(aggregate: &Aggregate, evaluation: &Evaluation) -> String {
    let icon = match evaluation.decision {
        Decision::Ok => "✅",
        Decision::BudgetExceeded | Decision::BaselineRegression => "❌",
    };

    let mut lines = vec![
        "## Query budget report".to_string(),
        String::new(),
        format!("**Result:** {} {}", icon, evaluation.decision.label()),
        String::new(),
        "### Overview".to_string(),
        String::new(),
        "| Files | Queries | Total duration | Average duration | Events listed |".to_string(),
        "|---:|---:|---:|---:|---:|".to_string(),
        format!(
            "| {} | {} | {} | {} | {} |",
            aggregate.file_count,
            aggregate.total_queries,
            Metric::TotalMs.format_value(aggregate.total_duration_ms),
            Metric::AverageMs.format_value(aggregate.average_duration_ms),
            aggregate.events.len()
        ),
    ];

    if aggregate.sampled {
        lines.push(String::new());
        lines.push(
            "> One or more inputs hold a Top-N sample; pattern budgets only saw the sampled events."
                .to_string(),
        );
    }

    lines.push(String::new());
    lines.push("### Thresholds".to_string());
    lines.push(String::new());
    if evaluation.thresholds.is_empty() {
        lines.push("_No numeric thresholds configured._".to_string());
    } else {
        lines.push("| Metric | Limit | Actual | Status |".to_string());
        lines.push("|---|---:|---:|---|".to_string());
        for f in &evaluation.thresholds {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                f.metric.label(),
                f.metric.format_value(f.limit),
                f.metric.format_value(f.actual),
                status(f.passed)
            ));
        }
    }

    lines.push(String::new());
    lines.push("### Pattern budgets".to_string());
    lines.push(String::new());
    if evaluation.patterns.is_empty() {
        lines.push("_No pattern budgets configured._".to_string());
    } else {
        lines.push("| Pattern | Max | Matches | Status |".to_string());
        lines.push("|---|---:|---:|---|".to_string());
        for p in &evaluation.patterns {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                code_cell(&p.pattern),
                p.max,
                p.count,
                status(p.passed)
            ));
        }
    }

    if let Some(cmp) = &evaluation.baseline {
        lines.push(String::new());
        lines.push(format!("### Baseline (+{}% allowed)", cmp.allowed_percent));
        lines.push(String::new());
        lines.push("| Metric | Baseline | Allowed | Actual | Status |".to_string());
        lines.push("|---|---:|---:|---:|---|".to_string());
        for row in &cmp.rows {
            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                row.metric.label(),
                row.metric.format_value(row.baseline),
                row.metric.format_value(row.allowed),
                row.metric.format_value(row.actual),
                status(row.passed)
            ));
        }
    }

    lines.push(String::new());
    lines.push("### Violations".to_string());
    lines.push(String::new());
    if evaluation.violations.is_empty() {
        lines.push("_None._".to_string());
    } else {
        for v in &evaluation.violations {
            lines.push(format!("- {}", escape_cell(v)));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn status(passed: bool) -> &'static str {
    if passed { PASS } else { FAIL }
}

/// Keep user text from breaking out of a table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn code_cell(text: &str) -> String {
    let text = escape_cell(text);
    if text.contains('`') {
        format!("`` {text} ``")
    } else {
        format!("`{text}`")
    }
}
