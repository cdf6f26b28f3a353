//! Numeric budgets shared by in-process reports and the CI gate

use std::fmt;

use serde::{Deserialize, Serialize};

/// Slack for floating comparisons so representation error never fails a budget.
pub const EPSILON: f64 = 1e-9;

/// `actual` strictly exceeds `limit`, ignoring representation error.
pub fn exceeds(actual: f64, limit: f64) -> bool {
    actual > limit + EPSILON
}

/// Count, total and average of a set of events, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub queries: u64,
    pub total_ms: f64,
    pub average_ms: f64,
}

impl Totals {
    pub fn new(queries: u64, total_ms: f64) -> Self {
        let average_ms = if queries == 0 {
            0.0
        } else {
            total_ms / queries as f64
        };
        Self {
            queries,
            total_ms,
            average_ms,
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Queries => self.queries as f64,
            Metric::AverageMs => self.average_ms,
            Metric::TotalMs => self.total_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Queries,
    AverageMs,
    TotalMs,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Queries, Metric::AverageMs, Metric::TotalMs];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Queries => "Total queries",
            Metric::AverageMs => "Average duration",
            Metric::TotalMs => "Total duration",
        }
    }

    /// Render a value of this metric for humans.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::Queries => format!("{}", value.round() as i64),
            Metric::AverageMs | Metric::TotalMs => format!("{value:.2} ms"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional upper bounds; `None` means unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_average_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_ms: Option<f64>,
}

impl Thresholds {
    pub fn limit(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Queries => self.max_queries.map(|q| q as f64),
            Metric::AverageMs => self.max_average_ms,
            Metric::TotalMs => self.max_total_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.limit(*m).is_none())
    }

    /// One finding per configured threshold, in `Metric::ALL` order.
    pub fn evaluate(&self, totals: &Totals) -> Vec<ThresholdFinding> {
        Metric::ALL
            .iter()
            .filter_map(|&metric| {
                let limit = self.limit(metric)?;
                let actual = totals.get(metric);
                Some(ThresholdFinding {
                    metric,
                    limit,
                    actual,
                    passed: !exceeds(actual, limit),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFinding {
    pub metric: Metric,
    pub limit: f64,
    pub actual: f64,
    pub passed: bool,
}

impl ThresholdFinding {
    pub fn violation(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        Some(format!(
            "{} {} exceeds limit {}",
            self.metric.label(),
            self.metric.format_value(self.actual),
            self.metric.format_value(self.limit)
        ))
    }
}
