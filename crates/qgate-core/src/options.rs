//! Capture session configuration

use std::time::Duration;

use qgate_security::{Pipeline, Redact};
use serde::{Deserialize, Serialize};

use crate::thresholds::Thresholds;

/// Which kind of adapter produced a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// A wrapped database driver / connection.
    Driver,
    /// An ORM interceptor.
    Orm,
}

/// Per-source text capture overrides. When set, an override wins over the
/// global toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm: Option<bool>,
}

impl SourceOverrides {
    pub fn get(&self, source: CaptureSource) -> Option<bool> {
        match source {
            CaptureSource::Driver => self.driver,
            CaptureSource::Orm => self.orm,
        }
    }

    pub fn set(&mut self, source: CaptureSource, capture_text: bool) {
        match source {
            CaptureSource::Driver => self.driver = Some(capture_text),
            CaptureSource::Orm => self.orm = Some(capture_text),
        }
    }
}

/// Session options. Immutable once built.
#[derive(Debug, Clone)]
pub struct Options {
    capture_text: bool,
    redactors: Pipeline,
    thresholds: Thresholds,
    overrides: SourceOverrides,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capture_text: true,
            redactors: Pipeline::new(),
            thresholds: Thresholds::default(),
            overrides: SourceOverrides::default(),
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Global text capture toggle.
    pub fn captures_text(&self) -> bool {
        self.capture_text
    }

    /// Effective toggle for one adapter: its override if set, else the global one.
    pub fn captures_text_for(&self, source: CaptureSource) -> bool {
        self.overrides.get(source).unwrap_or(self.capture_text)
    }

    pub fn redactors(&self) -> &Pipeline {
        &self.redactors
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn overrides(&self) -> &SourceOverrides {
        &self.overrides
    }
}

#[derive(Debug, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn capture_text(mut self, enabled: bool) -> Self {
        self.options.capture_text = enabled;
        self
    }

    pub fn redactors(mut self, pipeline: Pipeline) -> Self {
        self.options.redactors = pipeline;
        self
    }

    /// Append one redactor to the end of the pipeline.
    pub fn redactor(mut self, redactor: impl Redact + 'static) -> Self {
        self.options.redactors = self.options.redactors.with(redactor);
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.options.thresholds = thresholds;
        self
    }

    pub fn max_queries(mut self, max: u64) -> Self {
        self.options.thresholds.max_queries = Some(max);
        self
    }

    pub fn max_average_duration(mut self, max: Duration) -> Self {
        self.options.thresholds.max_average_ms = Some(max.as_secs_f64() * 1000.0);
        self
    }

    pub fn max_total_duration(mut self, max: Duration) -> Self {
        self.options.thresholds.max_total_ms = Some(max.as_secs_f64() * 1000.0);
        self
    }

    pub fn source_override(mut self, source: CaptureSource, capture_text: bool) -> Self {
        self.options.overrides.set(source, capture_text);
        self
    }

    pub fn overrides(mut self, overrides: SourceOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.captures_text());
        assert!(options.redactors().is_empty());
        assert!(options.thresholds().is_empty());
    }

    #[test]
    fn test_override_wins_over_global() {
        let options = Options::builder()
            .capture_text(true)
            .source_override(CaptureSource::Orm, false)
            .build();
        assert!(options.captures_text_for(CaptureSource::Driver));
        assert!(!options.captures_text_for(CaptureSource::Orm));

        let options = Options::builder()
            .capture_text(false)
            .source_override(CaptureSource::Driver, true)
            .build();
        assert!(options.captures_text_for(CaptureSource::Driver));
        assert!(!options.captures_text_for(CaptureSource::Orm));
    }

    #[test]
    fn test_duration_thresholds_in_ms() {
        let options = Options::builder()
            .max_average_duration(Duration::from_millis(15))
            .max_total_duration(Duration::from_secs(2))
            .max_queries(10)
            .build();
        let t = options.thresholds();
        assert_eq!(t.max_queries, Some(10));
        assert!((t.max_average_ms.unwrap() - 15.0).abs() < 1e-9);
        assert!((t.max_total_ms.unwrap() - 2000.0).abs() < 1e-9);
    }
}
