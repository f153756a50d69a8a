//! Runner configuration.
//!
//! Every field has a serde default, so partial JSON documents are valid.
//! Environment variables override individual fields:
//!
//! | Variable | Field |
//! |---|---|
//! | `REVIEWFLOW_MAX_ATTEMPTS` | `retry.max_attempts` |
//! | `REVIEWFLOW_BASE_DELAY_MS` | `retry.base_delay_ms` |
//! | `REVIEWFLOW_GENERATION_TIMEOUT_MS` | `generation_timeout_ms` |
//! | `REVIEWFLOW_FEEDBACK_TIMEOUT_SECS` | `feedback_timeout_secs` |
//! | `REVIEWFLOW_MAX_DRAFTING_CYCLES` | `limits.max_drafting_cycles` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub use crate::engine::{AmbiguousAssessmentPolicy, EngineLimits};
pub use crate::runner::{BackoffStrategy, JitterStrategy, RetryConfig};

/// Configuration of a [`WorkflowRunner`](crate::runner::WorkflowRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Retry policy for generation calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Bound on a single generation call in milliseconds.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,
    /// Deadline applied to feedback requests the port leaves unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_timeout_secs: Option<u64>,
    /// Transition engine limits.
    #[serde(default)]
    pub limits: EngineLimits,
}

const fn default_generation_timeout_ms() -> u64 {
    60_000
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            generation_timeout_ms: default_generation_timeout_ms(),
            feedback_timeout_secs: None,
            limits: EngineLimits::default(),
        }
    }
}

impl RunnerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the generation call timeout.
    #[must_use]
    pub const fn with_generation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.generation_timeout_ms = timeout_ms;
        self
    }

    /// Sets the fallback feedback deadline.
    #[must_use]
    pub const fn with_feedback_timeout_secs(mut self, secs: u64) -> Self {
        self.feedback_timeout_secs = Some(secs);
        self
    }

    /// Sets the engine limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the generation timeout as a duration.
    #[must_use]
    pub const fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Returns the fallback feedback deadline as a duration.
    #[must_use]
    pub fn feedback_timeout(&self) -> Option<Duration> {
        self.feedback_timeout_secs.map(Duration::from_secs)
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds the default configuration overridden by `REVIEWFLOW_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(attempts) = parse_with(&lookup, "REVIEWFLOW_MAX_ATTEMPTS") {
            self.retry = self.retry.with_max_attempts(attempts);
        }
        if let Some(delay) = parse_with(&lookup, "REVIEWFLOW_BASE_DELAY_MS") {
            self.retry = self.retry.with_base_delay_ms(delay);
        }
        if let Some(timeout) = parse_with(&lookup, "REVIEWFLOW_GENERATION_TIMEOUT_MS") {
            self.generation_timeout_ms = timeout;
        }
        if let Some(secs) = parse_with(&lookup, "REVIEWFLOW_FEEDBACK_TIMEOUT_SECS") {
            self.feedback_timeout_secs = Some(secs);
        }
        if let Some(cycles) = parse_with(&lookup, "REVIEWFLOW_MAX_DRAFTING_CYCLES") {
            self.limits = self.limits.with_max_drafting_cycles(cycles);
        }
        self
    }
}

fn parse_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            None
        }
    }
}

/// Reads and parses an environment variable.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    parse_with(&|k: &str| std::env::var(k).ok(), key)
}
