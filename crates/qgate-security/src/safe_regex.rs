//! Guarded regex compilation
//!
//! Patterns run on the linear-time `regex` engine whenever possible. Patterns
//! that need backtracking features (look-around, back-references, atomic
//! groups, recursion, balancing groups) are detected up front and compiled
//! with `fancy-regex` instead, under a bounded backtrack limit that plays the
//! role of a match timeout.

use std::ops::Range;

use thiserror::Error;

use crate::error::{RedactError, Result};

/// Compiled program size cap for the linear engine.
const SIZE_LIMIT: usize = 1 << 20;
/// Lazy DFA cache cap for the linear engine.
const DFA_SIZE_LIMIT: usize = 2 << 20;
/// Backtracking steps allowed per match attempt on the fallback engine.
pub const BACKTRACK_LIMIT: usize = 100_000;

/// Capture group spans of a single match, group 0 first.
pub type Spans = Vec<Option<Range<usize>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Linear,
    Backtracking,
}

/// A match attempt was aborted by the backtrack limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("regex match limit exceeded")]
pub struct MatchLimitExceeded;

#[derive(Debug, Clone)]
enum Inner {
    Linear(regex::Regex),
    Backtracking(fancy_regex::Regex),
}

/// A compiled pattern with bounded execution cost.
#[derive(Debug, Clone)]
pub struct SafeRegex {
    pattern: String,
    inner: Inner,
}

impl SafeRegex {
    /// Compile `pattern`, preferring the linear engine.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::build(pattern, false)
    }

    /// Compile `pattern` with case-insensitive matching.
    pub fn case_insensitive(pattern: &str) -> Result<Self> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, ignore_case: bool) -> Result<Self> {
        if !requires_backtracking(pattern) {
            match regex::RegexBuilder::new(pattern)
                .case_insensitive(ignore_case)
                .size_limit(SIZE_LIMIT)
                .dfa_size_limit(DFA_SIZE_LIMIT)
                .build()
            {
                Ok(re) => {
                    return Ok(Self {
                        pattern: pattern.to_string(),
                        inner: Inner::Linear(re),
                    });
                }
                Err(linear_err) => {
                    // Syntax the scanner missed; let the backtracking engine try it.
                    return Self::build_backtracking(pattern, ignore_case).map_err(|_| {
                        RedactError::InvalidPattern {
                            pattern: pattern.to_string(),
                            reason: linear_err.to_string(),
                        }
                    });
                }
            }
        }

        Self::build_backtracking(pattern, ignore_case)
    }

    fn build_backtracking(pattern: &str, ignore_case: bool) -> Result<Self> {
        let source = if ignore_case {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };

        let re = fancy_regex::RegexBuilder::new(&source)
            .backtrack_limit(BACKTRACK_LIMIT)
            .build()
            .map_err(|e| RedactError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            inner: Inner::Backtracking(re),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn engine(&self) -> Engine {
        match self.inner {
            Inner::Linear(_) => Engine::Linear,
            Inner::Backtracking(_) => Engine::Backtracking,
        }
    }

    pub fn is_match(&self, text: &str) -> std::result::Result<bool, MatchLimitExceeded> {
        match &self.inner {
            Inner::Linear(re) => Ok(re.is_match(text)),
            Inner::Backtracking(re) => re.is_match(text).map_err(|_| MatchLimitExceeded),
        }
    }

    /// Spans of every non-overlapping match, left to right.
    pub fn captures_spans(&self, text: &str) -> std::result::Result<Vec<Spans>, MatchLimitExceeded> {
        match &self.inner {
            Inner::Linear(re) => Ok(re
                .captures_iter(text)
                .map(|caps| caps.iter().map(|m| m.map(|m| m.range())).collect())
                .collect()),
            Inner::Backtracking(re) => {
                let mut all = Vec::new();
                for caps in re.captures_iter(text) {
                    let caps = caps.map_err(|_| MatchLimitExceeded)?;
                    all.push(
                        caps.iter()
                            .map(|m| m.map(|m| m.start()..m.end()))
                            .collect(),
                    );
                }
                Ok(all)
            }
        }
    }
}

/// Syntactic scan for constructs the linear engine cannot run.
///
/// Escapes and character classes are skipped so that `\(?=` or `[(?=]` are
/// not mistaken for look-ahead.
pub fn requires_backtracking(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    let mut in_class = false;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if let Some(&next) = bytes.get(i + 1) {
                    // \1..\9 back-references, \k<name> / \k'name' named ones
                    if !in_class && (matches!(next, b'1'..=b'9') || next == b'k') {
                        return true;
                    }
                }
                i += 2;
                continue;
            }
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'(' if !in_class => {
                if group_needs_backtracking(&bytes[i + 1..]) {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }

    false
}

fn group_needs_backtracking(rest: &[u8]) -> bool {
    if rest.first() != Some(&b'?') {
        return false;
    }
    let rest = &rest[1..];

    // look-ahead, atomic groups, recursion, named back-references
    if rest.starts_with(b"=")
        || rest.starts_with(b"!")
        || rest.starts_with(b">")
        || rest.starts_with(b"R")
        || rest.starts_with(b"&")
        || rest.starts_with(b"P=")
        || rest.starts_with(b"P>")
        || rest.first().is_some_and(u8::is_ascii_digit)
    {
        return true;
    }

    // look-behind or a .NET balancing group such as (?<open-close>...)
    if let Some(after) = rest.strip_prefix(b"<").or_else(|| rest.strip_prefix(b"'")) {
        if after.starts_with(b"=") || after.starts_with(b"!") {
            return true;
        }
        let name_end = after
            .iter()
            .position(|&b| b == b'>' || b == b'\'')
            .unwrap_or(after.len());
        return after[..name_end].contains(&b'-');
    }

    false
}
