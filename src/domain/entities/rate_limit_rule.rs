//! Rate limit rules keyed by request path.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Request budget for one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl RateLimitRule {
    /// Longest accepted window, one year.
    pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

    pub const fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self::new(100, 60)
    }
}

impl fmt::Display for RateLimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.max_requests, self.window_seconds)
    }
}

/// Error returned when a rule string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rate limit rule '{0}', expected 'max/window_seconds'")]
pub struct RuleParseError(pub String);

impl FromStr for RateLimitRule {
    type Err = RuleParseError;

    /// Parses `max/window_seconds`, e.g. `5/300`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (max, window) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| RuleParseError(s.to_string()))?;

        let max_requests = max
            .trim()
            .parse()
            .map_err(|_| RuleParseError(s.to_string()))?;
        let window_seconds = window
            .trim()
            .parse()
            .map_err(|_| RuleParseError(s.to_string()))?;

        Ok(Self::new(max_requests, window_seconds))
    }
}

/// Per-path rules with a fallback for unmatched paths.
///
/// Matching is by exact path, not prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitRules {
    default: RateLimitRule,
    by_path: HashMap<String, RateLimitRule>,
}

impl RateLimitRules {
    pub fn new(default: RateLimitRule) -> Self {
        Self {
            default,
            by_path: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, path: impl Into<String>, rule: RateLimitRule) -> Self {
        self.by_path.insert(path.into(), rule);
        self
    }

    /// Returns the rule for `path`, falling back to the default rule.
    pub fn rule_for(&self, path: &str) -> RateLimitRule {
        self.by_path.get(path).copied().unwrap_or(self.default)
    }

    pub fn default_rule(&self) -> RateLimitRule {
        self.default
    }

    /// Iterates over the explicit path rules.
    pub fn iter(&self) -> impl Iterator<Item = (&str, RateLimitRule)> {
        self.by_path.iter().map(|(path, rule)| (path.as_str(), *rule))
    }

    /// Parses a comma separated `path=max/window` list.
    pub fn parse_list(default: RateLimitRule, list: &str) -> Result<Self, RuleParseError> {
        let mut rules = Self::new(default);

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (path, rule) = entry
                .split_once('=')
                .ok_or_else(|| RuleParseError(entry.to_string()))?;
            rules = rules.with_rule(path.trim(), rule.parse()?);
        }

        Ok(rules)
    }
}
