//! Budget and baseline evaluation
//!
//! Turns an [`Aggregate`] plus a [`GatePolicy`] into an [`Evaluation`]: the
//! per-check findings, an ordered list of violation messages and the final
//! [`Decision`]. Rendering only formats this result; nothing here is
//! recomputed downstream.

use qgate_core::thresholds::exceeds;
use qgate_core::{Metric, Summary, ThresholdFinding, Thresholds, Totals};
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::budget::PatternBudget;

/// Stored snapshot to compare against, with the tolerated drift.
#[derive(Debug, Clone)]
pub struct BaselinePolicy {
    pub summary: Summary,
    pub allowed_percent: f64,
}

impl BaselinePolicy {
    pub fn new(summary: Summary, allowed_percent: f64) -> Self {
        Self {
            summary,
            allowed_percent,
        }
    }
}

/// Everything the gate checks.
#[derive(Debug, Clone, Default)]
pub struct GatePolicy {
    pub thresholds: Thresholds,
    pub budgets: Vec<PatternBudget>,
    pub baseline: Option<BaselinePolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternFinding {
    pub pattern: String,
    pub is_regex: bool,
    pub max: u64,
    pub count: u64,
    pub passed: bool,
}

impl PatternFinding {
    pub fn violation(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        Some(format!(
            "Pattern budget '{}' matched {} event(s), max {}",
            self.pattern, self.count, self.max
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineRow {
    pub metric: Metric,
    pub baseline: f64,
    pub allowed: f64,
    pub actual: f64,
    pub passed: bool,
}

impl BaselineRow {
    pub fn violation(&self, allowed_percent: f64) -> Option<String> {
        if self.passed {
            return None;
        }
        Some(format!(
            "Baseline regression: {} {} exceeds allowed {} (baseline {} +{}%)",
            self.metric.label(),
            self.metric.format_value(self.actual),
            self.metric.format_value(self.allowed),
            self.metric.format_value(self.baseline),
            allowed_percent
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub allowed_percent: f64,
    pub rows: Vec<BaselineRow>,
}

impl BaselineComparison {
    /// Compare every metric of `current` against `baseline` scaled by
    /// `1 + allowed_percent / 100`.
    pub fn compare(baseline: &Totals, current: &Totals, allowed_percent: f64) -> Self {
        let factor = 1.0 + allowed_percent / 100.0;
        let rows = Metric::ALL
            .iter()
            .map(|&metric| {
                let base = baseline.get(metric);
                let allowed = base * factor;
                let actual = current.get(metric);
                BaselineRow {
                    metric,
                    baseline: base,
                    allowed,
                    actual,
                    passed: !exceeds(actual, allowed),
                }
            })
            .collect();

        Self {
            allowed_percent,
            rows,
        }
    }

    pub fn regressed(&self) -> bool {
        self.rows.iter().any(|r| !r.passed)
    }

    pub fn violations(&self) -> impl Iterator<Item = String> + '_ {
        self.rows
            .iter()
            .filter_map(|r| r.violation(self.allowed_percent))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Ok,
    BudgetExceeded,
    BaselineRegression,
}

impl Decision {
    pub fn exit_code(&self) -> u8 {
        match self {
            Decision::Ok => 0,
            Decision::BudgetExceeded => 4,
            Decision::BaselineRegression => 5,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Decision::Ok)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Ok => "OK",
            Decision::BudgetExceeded => "Budget exceeded",
            Decision::BaselineRegression => "Baseline regression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub thresholds: Vec<ThresholdFinding>,
    pub patterns: Vec<PatternFinding>,
    pub baseline: Option<BaselineComparison>,
    /// Thresholds first, then pattern budgets, then baseline rows.
    pub violations: Vec<String>,
    pub decision: Decision,
}

pub fn evaluate(aggregate: &Aggregate, policy: &GatePolicy) -> Evaluation {
    let totals = aggregate.totals();

    let thresholds = policy.thresholds.evaluate(&totals);

    let patterns: Vec<PatternFinding> = policy
        .budgets
        .iter()
        .map(|budget| {
            let count = budget.count_matches(aggregate.texts());
            PatternFinding {
                pattern: budget.raw().to_string(),
                is_regex: budget.is_regex(),
                max: budget.max(),
                count,
                passed: count <= budget.max(),
            }
        })
        .collect();

    let baseline = policy.baseline.as_ref().map(|b| {
        BaselineComparison::compare(&b.summary.totals(), &totals, b.allowed_percent)
    });

    let mut violations: Vec<String> = thresholds
        .iter()
        .filter_map(ThresholdFinding::violation)
        .collect();
    violations.extend(patterns.iter().filter_map(PatternFinding::violation));
    let budget_violations = violations.len();
    if let Some(cmp) = &baseline {
        violations.extend(cmp.violations());
    }

    let decision = if baseline.as_ref().is_some_and(BaselineComparison::regressed) {
        Decision::BaselineRegression
    } else if budget_violations > 0 {
        Decision::BudgetExceeded
    } else {
        Decision::Ok
    };

    tracing::debug!(
        violations = violations.len(),
        decision = decision.label(),
        "evaluation complete"
    );

    Evaluation {
        thresholds,
        patterns,
        baseline,
        violations,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgate_core::SummaryEvent;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn summary(texts: &[&str], total_ms: f64) -> Summary {
        let queries = texts.len() as u64;
        Summary {
            schema: "1.0.0".to_string(),
            started_at: datetime!(2024-03-01 12:00 UTC),
            stopped_at: datetime!(2024-03-01 12:05 UTC),
            total_queries: queries,
            total_duration_ms: total_ms,
            average_duration_ms: Totals::new(queries, total_ms).average_ms,
            events: texts
                .iter()
                .map(|t| SummaryEvent {
                    at: datetime!(2024-03-01 12:01 UTC),
                    duration_ms: 1.0,
                    text: t.to_string(),
                    metadata: None,
                })
                .collect(),
            meta: BTreeMap::new(),
        }
    }

    fn queries(n: u64) -> Summary {
        let mut s = summary(&[], 0.0);
        s.total_queries = n;
        s
    }

    fn budget(spec: &str) -> PatternBudget {
        PatternBudget::parse(spec).unwrap()
    }

    #[test]
    fn test_empty_policy_is_ok() {
        let agg = Aggregate::from_summaries([&summary(&["SELECT 1"], 5.0)]);
        let eval = evaluate(&agg, &GatePolicy::default());
        assert_eq!(eval.decision, Decision::Ok);
        assert!(eval.violations.is_empty());
        assert!(eval.thresholds.is_empty());
        assert!(eval.baseline.is_none());
    }

    #[test]
    fn test_pattern_budget_boundary() {
        let policy = GatePolicy {
            budgets: vec![budget("SELECT * FROM Users*=1")],
            ..Default::default()
        };

        let two = summary(&["SELECT * FROM Users", "SELECT * FROM Users WHERE Id = 1"], 2.0);
        let eval = evaluate(&Aggregate::from_summaries([&two]), &policy);
        assert_eq!(eval.patterns[0].count, 2);
        assert!(!eval.patterns[0].passed);
        assert_eq!(eval.decision, Decision::BudgetExceeded);
        assert_eq!(
            eval.violations,
            vec!["Pattern budget 'SELECT * FROM Users*' matched 2 event(s), max 1".to_string()]
        );

        let one = summary(&["SELECT * FROM Users", "SELECT * FROM Orders"], 2.0);
        let eval = evaluate(&Aggregate::from_summaries([&one]), &policy);
        assert_eq!(eval.patterns[0].count, 1);
        assert_eq!(eval.decision, Decision::Ok);
    }

    #[test]
    fn test_threshold_equal_to_limit_passes() {
        let policy = GatePolicy {
            thresholds: Thresholds {
                max_queries: Some(2),
                max_average_ms: Some(0.1 + 0.2),
                max_total_ms: None,
            },
            ..Default::default()
        };
        let agg = Aggregate::from_summaries([&summary(&["A", "B"], 0.6)]);
        let eval = evaluate(&agg, &policy);
        assert_eq!(eval.thresholds.len(), 2);
        assert!(eval.thresholds.iter().all(|f| f.passed));
        assert_eq!(eval.decision, Decision::Ok);
    }

    #[test]
    fn test_baseline_tolerance() {
        let policy = GatePolicy {
            baseline: Some(BaselinePolicy::new(queries(10), 20.0)),
            ..Default::default()
        };

        let eval = evaluate(&Aggregate::from_summaries([&queries(12)]), &policy);
        assert_eq!(eval.decision, Decision::Ok);
        let cmp = eval.baseline.unwrap();
        assert!((cmp.rows[0].allowed - 12.0).abs() < 1e-9);

        let eval = evaluate(&Aggregate::from_summaries([&queries(13)]), &policy);
        assert_eq!(eval.decision, Decision::BaselineRegression);
        assert_eq!(eval.violations.len(), 1);
        assert!(eval.violations[0].starts_with("Baseline regression: Total queries 13"));
    }

    #[test]
    fn test_baseline_outranks_budget() {
        let policy = GatePolicy {
            thresholds: Thresholds {
                max_queries: Some(1),
                ..Default::default()
            },
            budgets: vec![budget("*=0")],
            baseline: Some(BaselinePolicy::new(summary(&["A"], 1.0), 0.0)),
        };
        let agg = Aggregate::from_summaries([&summary(&["A", "B"], 2.0)]);
        let eval = evaluate(&agg, &policy);

        assert_eq!(eval.decision, Decision::BaselineRegression);
        assert_eq!(eval.decision.exit_code(), 5);
        // threshold, pattern, then baseline (queries and total; average is flat)
        assert_eq!(eval.violations.len(), 4);
        assert!(eval.violations[0].starts_with("Total queries"));
        assert!(eval.violations[1].starts_with("Pattern budget"));
        assert!(eval.violations[2].starts_with("Baseline regression: Total queries"));
        assert!(eval.violations[3].starts_with("Baseline regression: Total duration"));
    }

    #[test]
    fn test_zero_baseline() {
        let policy = GatePolicy {
            baseline: Some(BaselinePolicy::new(queries(0), 50.0)),
            ..Default::default()
        };
        let eval = evaluate(&Aggregate::from_summaries([&queries(0)]), &policy);
        assert!(eval.decision.is_ok());
        let eval = evaluate(&Aggregate::from_summaries([&queries(1)]), &policy);
        assert_eq!(eval.decision, Decision::BaselineRegression);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Decision::Ok.exit_code(), 0);
        assert_eq!(Decision::BudgetExceeded.exit_code(), 4);
        assert_eq!(Decision::BaselineRegression.exit_code(), 5);
    }
}
