//! Tracing setup and span helpers.

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::InstanceId;

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Reads `REVIEWFLOW_LOG_FORMAT` (`json` or `text`).
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("REVIEWFLOW_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Installs a global subscriber filtered by `RUST_LOG` (default `info`).
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    }
}

/// Span wrapping every runner operation on one instance.
#[must_use]
pub fn workflow_span(operation: &'static str, instance_id: InstanceId) -> Span {
    tracing::info_span!("workflow", operation, instance_id = %instance_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_serde() {
        assert_eq!(serde_json::to_value(LogFormat::Json).unwrap(), "json");
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_init_tracing_twice_fails_cleanly() {
        let first = init_tracing(LogFormat::Text);
        let second = init_tracing(LogFormat::Json);
        // Another test may have installed a subscriber first.
        assert!(first.is_err() || second.is_err());
    }

    #[test]
    fn test_workflow_span_builds() {
        let span = workflow_span("start", InstanceId::new());
        let _entered = span.enter();
    }
}
