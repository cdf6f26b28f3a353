use std::path::{Path, PathBuf};

use anyhow::Context;
use qgate_core::{CaptureSource, Options, OptionsBuilder, Thresholds};
use qgate_security::rules::{self, BUILTIN_NAMES, MASK};
use qgate_security::Pipeline;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "qgate.toml";

/// Settings for qgate, read from `qgate.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

/// `[gate]`: defaults for `qgate check`. Command-line flags win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queries: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_average_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_ms: Option<f64>,

    /// `<pattern>=<max>` or `regex:<pattern>=<max>`
    #[serde(default)]
    pub budgets: Vec<String>,

    #[serde(default = "default_allowed_percent")]
    pub baseline_allowed_percent: f64,

    #[serde(default)]
    pub require_full_events: bool,
}

/// `[capture]`: how in-process sessions record and redact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub capture_text: bool,

    /// Keep only the N slowest events on export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_top: Option<i64>,

    /// Built-in redactor names, applied in this order
    #[serde(default = "default_redactors")]
    pub redactors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_capture_text: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm_capture_text: Option<bool>,

    /// Extra regex rules, applied after the built-ins
    #[serde(default)]
    pub custom: Vec<CustomRedactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRedactor {
    pub name: String,
    pub pattern: String,

    #[serde(default = "default_replacement")]
    pub replacement: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_queries: None,
            max_average_ms: None,
            max_total_ms: None,
            budgets: Vec::new(),
            baseline_allowed_percent: default_allowed_percent(),
            require_full_events: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_text: true,
            sample_top: None,
            redactors: default_redactors(),
            driver_capture_text: None,
            orm_capture_text: None,
            custom: Vec::new(),
        }
    }
}

fn default_allowed_percent() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn default_redactors() -> Vec<String> {
    BUILTIN_NAMES.iter().map(|n| n.to_string()).collect()
}

fn default_replacement() -> String {
    MASK.to_string()
}

impl GateConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            max_queries: self.max_queries,
            max_average_ms: self.max_average_ms,
            max_total_ms: self.max_total_ms,
        }
    }
}

impl CaptureConfig {
    /// Built-ins in configured order, then custom rules.
    pub fn pipeline(&self) -> anyhow::Result<Pipeline> {
        let mut pipeline = Pipeline::from_names(&self.redactors)?;
        for custom in &self.custom {
            let rule = rules::regex_replace(&custom.name, &custom.pattern, &custom.replacement)
                .with_context(|| format!("Invalid custom redactor '{}'", custom.name))?;
            pipeline = pipeline.with(rule);
        }
        Ok(pipeline)
    }

    pub fn options_builder(&self) -> anyhow::Result<OptionsBuilder> {
        let mut builder = Options::builder()
            .capture_text(self.capture_text)
            .redactors(self.pipeline()?);

        if let Some(enabled) = self.driver_capture_text {
            builder = builder.source_override(CaptureSource::Driver, enabled);
        }
        if let Some(enabled) = self.orm_capture_text {
            builder = builder.source_override(CaptureSource::Orm, enabled);
        }
        Ok(builder)
    }

    pub fn to_options(&self) -> anyhow::Result<Options> {
        Ok(self.options_builder()?.build())
    }
}

impl Config {
    /// Session options including the `[gate]` thresholds.
    pub fn to_options(&self) -> anyhow::Result<Options> {
        Ok(self
            .capture
            .options_builder()?
            .thresholds(self.gate.thresholds())
            .build())
    }

    /// Resolve configuration.
    ///
    /// Order: `explicit`, then `qgate.toml` walking up from the working
    /// directory, then the user config file, then built-in defaults.
    /// Returns the file that was used, if any.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<(Option<PathBuf>, Self)> {
        if let Some(path) = explicit {
            let config = Self::load_from(path)?;
            return Ok((Some(path.to_path_buf()), config));
        }

        let current = std::env::current_dir()?;
        if let Some(path) = Self::find_from(&current) {
            let config = Self::load_from(&path)?;
            return Ok((Some(path), config));
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            let config = Self::load_from(&path)?;
            return Ok((Some(path), config));
        }

        Ok((None, Self::default()))
    }

    /// Find qgate.toml by walking up from given directory
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let pct = self.gate.baseline_allowed_percent;
        if !pct.is_finite() || pct < 0.0 {
            anyhow::bail!("baseline_allowed_percent must be a non-negative number, got {pct}");
        }
        for (key, value) in [
            ("max_average_ms", self.gate.max_average_ms),
            ("max_total_ms", self.gate.max_total_ms),
        ] {
            if let Some(v) = value.filter(|v| !v.is_finite() || *v < 0.0) {
                anyhow::bail!("{key} must be a non-negative number, got {v}");
            }
        }
        Ok(())
    }

    /// User-level config file path
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "qgate", "qgate")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Starter file written by `qgate init`.
    pub fn template() -> String {
        let redactors = BUILTIN_NAMES
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"# qgate configuration
# Flags passed to `qgate check` override the values below.

[gate]
# max_queries = 200
# max_average_ms = 15.0
# max_total_ms = 2000.0
# budgets = ["SELECT * FROM Users*=1", "regex:^UPDATE\\s+Orders=5"]
baseline_allowed_percent = {pct:.1}
require_full_events = false

[capture]
capture_text = true
# sample_top = 50
redactors = [{redactors}]
# driver_capture_text = true
# orm_capture_text = false

# [[capture.custom]]
# name = "tenant"
# pattern = "tenant_[0-9]+"
# replacement = "tenant_[REDACTED]"
"#,
            pct = default_allowed_percent(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gate.baseline_allowed_percent, 10.0);
        assert!(config.gate.budgets.is_empty());
        assert!(config.gate.thresholds().is_empty());
        assert!(config.capture.capture_text);
        assert_eq!(config.capture.redactors.len(), BUILTIN_NAMES.len());
    }

    #[test]
    fn test_template_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [gate]
            max_queries = 50
            budgets = ["SELECT *=3"]
            "#,
        )
        .unwrap();
        assert_eq!(config.gate.max_queries, Some(50));
        assert_eq!(config.gate.baseline_allowed_percent, 10.0);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.gate.max_total_ms = Some(250.5);
        config.capture.sample_top = Some(20);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_capture_to_options() {
        let config: Config = toml::from_str(
            r#"
            [gate]
            max_queries = 2

            [capture]
            capture_text = false
            redactors = ["whitespace", "email"]
            orm_capture_text = true

            [[capture.custom]]
            name = "tenant"
            pattern = "tenant_[0-9]+"
            replacement = "tenant_[REDACTED]"
            "#,
        )
        .unwrap();

        let options = config.to_options().unwrap();
        assert_eq!(
            options.redactors().names(),
            vec!["whitespace", "email", "tenant"]
        );
        assert!(!options.captures_text());
        assert!(options.captures_text_for(CaptureSource::Orm));
        assert!(!options.captures_text_for(CaptureSource::Driver));
        assert_eq!(options.thresholds().max_queries, Some(2));
        assert_eq!(
            options.redactors().apply("SELECT  1 FROM tenant_42"),
            "SELECT 1 FROM tenant_[REDACTED]"
        );

        assert!(config.capture.to_options().unwrap().thresholds().is_empty());
    }

    #[test]
    fn test_unknown_redactor_rejected() {
        let capture = CaptureConfig {
            redactors: vec!["nope".to_string()],
            ..Default::default()
        };
        assert!(capture.to_options().is_err());
    }

    #[test]
    fn test_invalid_custom_pattern_names_rule() {
        let capture = CaptureConfig {
            custom: vec![CustomRedactor {
                name: "broken".to_string(),
                pattern: "(".to_string(),
                replacement: default_replacement(),
            }],
            ..Default::default()
        };
        let err = capture.pipeline().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_find_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        let file = dir.path().join("a").join(CONFIG_FILE_NAME);
        std::fs::write(&file, "[gate]\nmax_queries = 7\n").unwrap();

        assert_eq!(Config::find_from(&nested), Some(file.clone()));
        assert_eq!(Config::load_from(&file).unwrap().gate.max_queries, Some(7));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "[capture]\nsample_top = 5\n").unwrap();

        let (used, config) = Config::resolve(Some(&file)).unwrap();
        assert_eq!(used, Some(file));
        assert_eq!(config.capture.sample_top, Some(5));

        assert!(Config::resolve(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&file, "[gate]\nbaseline_allowed_percent = -5.0\n").unwrap();
        let err = Config::load_from(&file).unwrap_err();
        assert!(err.to_string().contains("baseline_allowed_percent"));

        std::fs::write(&file, "[gate]\nmax_total_ms = -1.0\n").unwrap();
        assert!(Config::load_from(&file).is_err());

        std::fs::write(&file, "[gate\n").unwrap();
        let err = Config::load_from(&file).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
