//! Pattern budgets: cap how often a query shape may appear

use std::fmt;
use std::str::FromStr;

use qgate_security::SafeRegex;

use crate::error::BudgetParseError;

const REGEX_PREFIX: &str = "regex:";

/// A `(pattern, max)` pair parsed from `<pattern>=<max>` or
/// `regex:<pattern>=<max>`.
#[derive(Debug, Clone)]
pub struct PatternBudget {
    raw: String,
    is_regex: bool,
    compiled_pattern: String,
    max: u64,
    matcher: SafeRegex,
}

impl PatternBudget {
    /// Parse a budget. The split happens on the last `=`, so patterns may
    /// contain `=` themselves.
    pub fn parse(spec: &str) -> Result<Self, BudgetParseError> {
        let spec = spec.trim();
        let (pattern, max) = spec
            .rsplit_once('=')
            .ok_or_else(|| BudgetParseError::MissingMax {
                spec: spec.to_string(),
            })?;

        let max = max
            .trim()
            .parse::<u64>()
            .map_err(|_| BudgetParseError::InvalidMax {
                spec: spec.to_string(),
                max: max.trim().to_string(),
            })?;

        let (is_regex, body) = match pattern.strip_prefix(REGEX_PREFIX) {
            Some(body) => (true, body),
            None => (false, pattern),
        };
        if body.is_empty() {
            return Err(BudgetParseError::EmptyPattern {
                spec: spec.to_string(),
            });
        }

        let compiled_pattern = if is_regex {
            body.to_string()
        } else {
            wildcard_to_regex(body)
        };

        let matcher = SafeRegex::case_insensitive(&compiled_pattern).map_err(|e| {
            BudgetParseError::InvalidRegex {
                spec: spec.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            is_regex,
            compiled_pattern,
            max,
            matcher,
        })
    }

    /// The pattern as written, including any `regex:` prefix.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    pub fn compiled_pattern(&self) -> &str {
        &self.compiled_pattern
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn matches(&self, text: &str) -> bool {
        match self.matcher.is_match(text) {
            Ok(hit) => hit,
            Err(_) => {
                tracing::warn!(
                    pattern = %self.raw,
                    "pattern budget hit the match limit; event not counted"
                );
                false
            }
        }
    }

    /// Number of `texts` this budget's pattern matches.
    pub fn count_matches<'a, I>(&self, texts: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts.into_iter().filter(|t| self.matches(t)).count() as u64
    }
}

impl FromStr for PatternBudget {
    type Err = BudgetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PatternBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.raw, self.max)
    }
}

/// Compile a `*`/`?` wildcard into an anchored whole-text regex.
/// Every other character matches literally.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 12);
    out.push_str("(?s)^(?:");

    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push_str(")$");
    out
}
