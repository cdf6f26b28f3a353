use std::collections::BTreeMap;

use qgate_core::summary::{META_SAMPLE_TOP, SCHEMA_VERSION};
use qgate_core::{Summary, SummaryEvent, Totals};
use time::OffsetDateTime;

pub const META_FILE_COUNT: &str = "fileCount";
pub const META_SOURCE: &str = "source";

/// Combined view over one or more summary documents. Recomputed from
/// scratch on every aggregation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    pub file_count: usize,
    pub total_queries: u64,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
    /// Every input's (possibly sampled) events, in input order.
    pub events: Vec<SummaryEvent>,
    /// True when any input carried only a Top-N sample.
    pub sampled: bool,
    pub started_at: Option<OffsetDateTime>,
    pub stopped_at: Option<OffsetDateTime>,
}

impl Aggregate {
    pub fn from_summaries<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a Summary>,
    {
        let mut agg = Aggregate::default();

        for summary in summaries {
            agg.file_count += 1;
            agg.total_queries += summary.total_queries;
            agg.total_duration_ms += summary.total_duration_ms;
            agg.events.extend(summary.events.iter().cloned());
            agg.sampled |= summary.is_sampled();
            agg.started_at = Some(match agg.started_at {
                Some(t) => t.min(summary.started_at),
                None => summary.started_at,
            });
            agg.stopped_at = Some(match agg.stopped_at {
                Some(t) => t.max(summary.stopped_at),
                None => summary.stopped_at,
            });
        }

        agg.average_duration_ms = Totals::new(agg.total_queries, agg.total_duration_ms).average_ms;
        agg
    }

    pub fn totals(&self) -> Totals {
        Totals {
            queries: self.total_queries,
            total_ms: self.total_duration_ms,
            average_ms: self.average_duration_ms,
        }
    }

    /// Event texts, in aggregate order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.text.as_str())
    }

    /// Summary document to store as a new baseline.
    pub fn to_baseline(&self) -> Summary {
        let now = OffsetDateTime::now_utc();
        let mut meta = BTreeMap::new();
        meta.insert(META_SOURCE.to_string(), "baseline".to_string());
        meta.insert(META_FILE_COUNT.to_string(), self.file_count.to_string());
        if self.sampled {
            meta.insert(META_SAMPLE_TOP.to_string(), self.events.len().to_string());
        }

        Summary {
            schema: SCHEMA_VERSION.to_string(),
            started_at: self.started_at.unwrap_or(now),
            stopped_at: self.stopped_at.unwrap_or(now),
            total_queries: self.total_queries,
            total_duration_ms: self.total_duration_ms,
            average_duration_ms: self.average_duration_ms,
            events: self.events.clone(),
            meta,
        }
    }
}
