//! Event domain model

use std::time::Duration;

use time::OffsetDateTime;

/// Structured facts attached to an event. Never redacted.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One recorded command execution.
///
/// `text` is already redacted, or empty when text capture was disabled; the
/// raw command text is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    text: String,
    duration: Duration,
    recorded_at: OffsetDateTime,
    metadata: Option<Metadata>,
}

impl Event {
    pub(crate) fn new(
        text: String,
        duration: Duration,
        recorded_at: OffsetDateTime,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            text,
            duration,
            recorded_at,
            metadata: metadata.filter(|m| !m.is_empty()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }

    pub fn recorded_at(&self) -> OffsetDateTime {
        self.recorded_at
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}
