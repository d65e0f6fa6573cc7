use std::fmt;

use regex::Regex;

use crate::error::PatternError;

pub const DEFAULT_PREFIX: &str = "TASK";

/// Compiled expression used to pull a task identifier out of a branch name.
///
/// The identifier is always capture group 1 of the first match.
#[derive(Debug, Clone)]
pub struct TaskIdPattern {
    regex: Regex,
}

impl TaskIdPattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|e| PatternError::Invalid {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        // captures_len counts the implicit whole-match group
        if regex.captures_len() < 2 {
            return Err(PatternError::NoCaptureGroup(pattern.to_string()));
        }
        Ok(Self { regex })
    }

    /// Pattern source for a prefix, e.g. `TASK` -> `(TASK-\d+)`.
    pub fn source_for_prefix(prefix: &str) -> String {
        format!(r"({}-\d+)", regex::escape(prefix))
    }

    pub fn from_prefix(prefix: &str) -> Result<Self, PatternError> {
        Self::new(&Self::source_for_prefix(prefix))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn extract(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// A task identifier split into its prefix and numeric suffix, e.g. `TASK-40`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskId {
    pub prefix: String,
    pub number: u64,
}

impl TaskId {
    /// Split on the final `-`. Returns `None` unless the suffix is numeric.
    pub fn parse(identifier: &str) -> Option<Self> {
        let (prefix, number) = identifier.rsplit_once('-')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            number: number.parse().ok()?,
        })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{}-{}", self.prefix, self.number)
        }
    }
}
