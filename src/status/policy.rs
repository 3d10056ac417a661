//! Ignore and only-last name policies.

use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// Prefix marking a policy entry as a regular expression.
pub const REGEX_PREFIX: &str = "re:";

/// A policy entry that failed to compile.
#[derive(Error, Debug)]
#[error("invalid pattern `{pattern}`: {}", summarize(.source))]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Last line of a regex diagnostic; the full one spans several lines.
fn summarize(err: &regex::Error) -> String {
    let text = err.to_string();
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Exact names plus compiled patterns matched against a monitor name.
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl NameMatcher {
    /// Build a matcher from config entries; `re:`-prefixed entries are regexes.
    ///
    /// Every bad pattern is reported, not only the first one.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, Vec<PatternError>> {
        let mut matcher = Self::default();
        let mut errors = Vec::new();

        for entry in entries {
            let entry = entry.as_ref();
            match entry.strip_prefix(REGEX_PREFIX) {
                Some(pattern) => match Regex::new(pattern) {
                    Ok(re) => matcher.patterns.push(re),
                    Err(source) => errors.push(PatternError {
                        pattern: pattern.to_string(),
                        source,
                    }),
                },
                None => {
                    matcher.exact.insert(entry.to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(matcher)
        } else {
            Err(errors)
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// Flags resolved for a single monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Suppressed from global alerting.
    pub ignored: bool,
    /// Classified from the most recent sample only.
    pub only_last: bool,
}

/// Ignore and only-last policy for a run.
#[derive(Debug, Clone, Default)]
pub struct IgnorePolicy {
    pub ignored: NameMatcher,
    pub only_last: NameMatcher,
}

impl IgnorePolicy {
    /// Compile both lists, collecting pattern errors from each of them.
    pub fn new<S: AsRef<str>>(ignore: &[S], only_last: &[S]) -> Result<Self, Vec<PatternError>> {
        let ignored = NameMatcher::from_entries(ignore);
        let only_last = NameMatcher::from_entries(only_last);

        match (ignored, only_last) {
            (Ok(ignored), Ok(only_last)) => Ok(Self { ignored, only_last }),
            (ignored, only_last) => {
                let mut errors = ignored.err().unwrap_or_default();
                errors.extend(only_last.err().unwrap_or_default());
                Err(errors)
            }
        }
    }

    pub fn flags_for(&self, name: &str) -> PolicyFlags {
        PolicyFlags {
            ignored: self.ignored.matches(name),
            only_last: self.only_last.matches(name),
        }
    }
}
