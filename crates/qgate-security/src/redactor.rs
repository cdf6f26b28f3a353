//! Redaction primitives

use std::fmt;

use crate::safe_regex::{MatchLimitExceeded, SafeRegex};

/// A pure, idempotent text-masking rule.
///
/// Implementations must satisfy `redact(redact(x)) == redact(x)` and map empty
/// input to empty output.
pub trait Redact: Send + Sync {
    fn name(&self) -> &str;

    fn redact(&self, input: &str) -> String;
}

/// Predicate over the matched text; a rejected match is left untouched.
pub type Guard = fn(&str) -> bool;

/// One pattern plus what to put in place of its target group.
#[derive(Debug, Clone)]
pub struct Rule {
    regex: SafeRegex,
    group: usize,
    replacement: String,
    guard: Option<Guard>,
}

impl Rule {
    /// Replace whole matches of `regex` with `replacement`.
    pub fn new(regex: SafeRegex, replacement: impl Into<String>) -> Self {
        Self {
            regex,
            group: 0,
            replacement: replacement.into(),
            guard: None,
        }
    }

    /// Only replace capture group `group`, keeping the rest of the match.
    pub fn on_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    fn apply(&self, input: &str) -> Result<String, MatchLimitExceeded> {
        let matches = self.regex.captures_spans(input)?;
        if matches.is_empty() {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for spans in matches {
            let Some(Some(target)) = spans.get(self.group).cloned() else {
                continue;
            };
            if let Some(guard) = self.guard {
                if !guard(&input[target.clone()]) {
                    continue;
                }
            }
            out.push_str(&input[last..target.start]);
            out.push_str(&self.replacement);
            last = target.end;
        }

        out.push_str(&input[last..]);
        Ok(out)
    }
}

/// A named sequence of regex rules applied one after another.
#[derive(Clone)]
pub struct PatternRedactor {
    name: String,
    rules: Vec<Rule>,
}

impl PatternRedactor {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn try_redact(&self, input: &str) -> Result<String, MatchLimitExceeded> {
        let mut current = input.to_string();
        for rule in &self.rules {
            current = rule.apply(&current)?;
        }
        Ok(current)
    }
}

impl Redact for PatternRedactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn redact(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }

        match self.try_redact(input) {
            Ok(redacted) => redacted,
            Err(MatchLimitExceeded) => {
                tracing::warn!(
                    redactor = %self.name,
                    len = input.len(),
                    "redaction aborted by match limit; text left unchanged"
                );
                input.to_string()
            }
        }
    }
}

impl fmt::Debug for PatternRedactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRedactor")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Collapses every whitespace run to a single space and trims both ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalizer;

impl Redact for WhitespaceNormalizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn redact(&self, input: &str) -> String {
        input.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_normalizer() {
        let n = WhitespaceNormalizer;
        assert_eq!(n.redact("  SELECT\t*\n\nFROM   t  "), "SELECT * FROM t");
        assert_eq!(n.redact(""), "");
        assert_eq!(n.redact(" \n\t "), "");
    }

    #[test]
    fn test_rule_group_replacement_keeps_context() {
        let rule = Rule::new(SafeRegex::new(r"(key=)(\w+)").unwrap(), "***").on_group(2);
        let r = PatternRedactor::new("kv", vec![rule]);
        assert_eq!(r.redact("a key=abc b key=def"), "a key=*** b key=***");
    }

    #[test]
    fn test_guard_rejects_match() {
        fn long(s: &str) -> bool {
            s.len() > 3
        }
        let rule = Rule::new(SafeRegex::new(r"\d+").unwrap(), "#").guarded(long);
        let r = PatternRedactor::new("digits", vec![rule]);
        assert_eq!(r.redact("12 12345 1"), "12 # 1");
    }

    #[test]
    fn test_match_limit_leaves_text_unchanged() {
        let rule = Rule::new(SafeRegex::new(r"(?i)(a|b|ab)*(?=c)").unwrap(), "X");
        let r = PatternRedactor::new("pathological", vec![rule]);
        let input = "ab".repeat(28);
        assert_eq!(r.redact(&input), input);
    }
}
