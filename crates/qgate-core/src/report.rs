//! Report domain model

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ThresholdError;
use crate::event::Event;
use crate::options::Options;
use crate::summary::{META_SAMPLE_TOP, META_SESSION_ID, SCHEMA_VERSION, Summary, SummaryEvent};
use crate::thresholds::{ThresholdFinding, Totals};

/// Immutable snapshot of a stopped session.
#[derive(Debug, Clone)]
pub struct Report {
    session_id: Uuid,
    started_at: OffsetDateTime,
    stopped_at: OffsetDateTime,
    options: Arc<Options>,
    events: Vec<Event>,
}

impl Report {
    pub(crate) fn new(
        session_id: Uuid,
        started_at: OffsetDateTime,
        stopped_at: OffsetDateTime,
        options: Arc<Options>,
        events: Vec<Event>,
    ) -> Self {
        Self {
            session_id,
            started_at,
            stopped_at,
            options,
            events,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn stopped_at(&self) -> OffsetDateTime {
        self.stopped_at
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn total_queries(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn total_duration(&self) -> Duration {
        self.events.iter().map(Event::duration).sum()
    }

    /// Zero when no events were recorded.
    pub fn average_duration(&self) -> Duration {
        let total = self.total_duration();
        match self.events.len() {
            0 => Duration::ZERO,
            n => match u32::try_from(n) {
                Ok(n) => total / n,
                Err(_) => total.div_f64(n as f64),
            },
        }
    }

    pub fn totals(&self) -> Totals {
        Totals::new(
            self.total_queries(),
            self.total_duration().as_secs_f64() * 1000.0,
        )
    }

    /// Evaluate the session's own thresholds against this report.
    pub fn threshold_findings(&self) -> Vec<ThresholdFinding> {
        self.options.thresholds().evaluate(&self.totals())
    }

    pub fn ensure_within_thresholds(&self) -> Result<(), ThresholdError> {
        let violations: Vec<String> = self
            .threshold_findings()
            .iter()
            .filter_map(ThresholdFinding::violation)
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ThresholdError(violations))
        }
    }

    /// Convert to the JSON summary form.
    ///
    /// `None` exports every event. `Some(k)` keeps the `k` longest events
    /// (ties keep recording order, negative `k` counts as zero) and records
    /// the effective `k` under `meta["sampleTop"]`. Totals always describe the
    /// full report.
    pub fn to_summary(&self, sample_top: Option<i64>) -> Summary {
        let totals = self.totals();
        let mut meta = BTreeMap::new();
        meta.insert(META_SESSION_ID.to_string(), self.session_id.to_string());

        let events: Vec<&Event> = match sample_top {
            None => self.events.iter().collect(),
            Some(k) => {
                let k = usize::try_from(k.max(0)).unwrap_or(usize::MAX);
                meta.insert(META_SAMPLE_TOP.to_string(), k.to_string());

                let mut longest: Vec<&Event> = self.events.iter().collect();
                // stable: equal durations keep insertion order
                longest.sort_by(|a, b| b.duration().cmp(&a.duration()));
                longest.truncate(k);
                longest
            }
        };

        Summary {
            schema: SCHEMA_VERSION.to_string(),
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            total_queries: totals.queries,
            total_duration_ms: totals.total_ms,
            average_duration_ms: totals.average_ms,
            events: events.into_iter().map(SummaryEvent::from).collect(),
            meta,
        }
    }
}
