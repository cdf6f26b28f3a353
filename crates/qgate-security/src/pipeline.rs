use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::redactor::Redact;
use crate::rules;

/// Caller-ordered list of redactors. Each stage sees the previous stage's output.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Redact>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in rule in the recommended order.
    pub fn recommended() -> Self {
        Self::from_names(rules::BUILTIN_NAMES).expect("built-in rule names resolve")
    }

    /// Build a pipeline from built-in rule names, keeping the given order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let stages = names
            .iter()
            .map(|name| rules::by_name(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { stages })
    }

    pub fn with(mut self, redactor: impl Redact + 'static) -> Self {
        self.stages.push(Arc::new(redactor));
        self
    }

    pub fn push(&mut self, redactor: Arc<dyn Redact>) {
        self.stages.push(redactor);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over `input` in order.
    pub fn apply(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }
        self.stages
            .iter()
            .fold(input.to_string(), |text, stage| stage.redact(&text))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
