//! Versioned JSON summary document
//!
//! The at-rest and wire form of a report. `events` may be a Top-N sample, in
//! which case `meta["sampleTop"]` is present.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::SummaryError;
use crate::event::{Event, Metadata};
use crate::thresholds::Totals;

pub const SCHEMA_VERSION: &str = "1.0.0";
pub const META_SAMPLE_TOP: &str = "sampleTop";
pub const META_SESSION_ID: &str = "sessionId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub schema: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub stopped_at: OffsetDateTime,
    pub total_queries: u64,
    pub total_duration_ms: f64,
    pub average_duration_ms: f64,
    #[serde(default)]
    pub events: Vec<SummaryEvent>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub duration_ms: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl From<&Event> for SummaryEvent {
    fn from(event: &Event) -> Self {
        Self {
            at: event.recorded_at(),
            duration_ms: event.duration_ms(),
            text: event.text().to_string(),
            metadata: event.metadata().cloned(),
        }
    }
}

impl Summary {
    pub fn totals(&self) -> Totals {
        Totals {
            queries: self.total_queries,
            total_ms: self.total_duration_ms,
            average_ms: self.average_duration_ms,
        }
    }

    /// Whether `events` is a Top-N sample rather than the full set.
    pub fn is_sampled(&self) -> bool {
        self.meta.contains_key(META_SAMPLE_TOP)
    }

    pub fn sample_top(&self) -> Option<usize> {
        self.meta.get(META_SAMPLE_TOP)?.parse().ok()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load a summary, keeping "missing" and "malformed" apart.
    pub fn load(path: &Path) -> Result<Self, SummaryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SummaryError::NotFound(path.to_path_buf())
            } else {
                SummaryError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let summary = Self::from_json(&content).map_err(|e| SummaryError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if is_newer_schema(&summary.schema) {
            tracing::warn!(
                path = %path.display(),
                schema = %summary.schema,
                supported = SCHEMA_VERSION,
                "summary uses a newer schema; reading best-effort"
            );
        }

        Ok(summary)
    }

    /// Write the summary, replacing `path` in one step.
    ///
    /// Missing parent directories are created. Content goes to a sibling
    /// temp file first and is then renamed over the destination.
    pub fn export_to_file(&self, path: &Path) -> Result<(), SummaryError> {
        let io_err = |source| SummaryError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = self.to_json_pretty()?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "summary.json".to_string());
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io_err(e)
        })?;

        tracing::debug!(path = %path.display(), events = self.events.len(), "summary exported");
        Ok(())
    }
}

/// Compare dotted numeric versions against `SCHEMA_VERSION`.
/// Anything unparsable counts as newer so that it is warned about.
pub fn is_newer_schema(version: &str) -> bool {
    fn parts(v: &str) -> Option<Vec<u64>> {
        v.split('.').map(|p| p.trim().parse().ok()).collect()
    }

    match (parts(version), parts(SCHEMA_VERSION)) {
        (Some(found), Some(supported)) => found > supported,
        _ => true,
    }
}
