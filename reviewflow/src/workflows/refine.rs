//! Single-pass refinement: brainstorm, write, critique, improve.
//!
//! No human gate. The critique of the first artifact is fed straight back
//! to the generation port as revision guidance.

use thiserror::Error;
use tracing::{debug, info, Instrument};

use crate::core::{GenerationParams, RefinedArtifact, WorkflowInput};
use crate::errors::GenerationError;
use crate::ports::GenerationPort;
use crate::runner::{with_retry, RetryConfig, RetryExhausted};

/// Default character limit for short refined artifacts.
pub const DEFAULT_MAX_CHARS: u32 = 150;

/// A refinement step failed after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Refine step '{step}' failed after {attempts} attempt(s): {source}")]
pub struct RefineError {
    /// The port operation that failed.
    pub step: &'static str,
    /// Attempts made.
    pub attempts: usize,
    /// Error from the final attempt.
    pub source: GenerationError,
}

impl RefineError {
    fn from_exhausted(step: &'static str, exhausted: RetryExhausted<GenerationError>) -> Self {
        Self {
            step,
            attempts: exhausted.attempts,
            source: exhausted.last,
        }
    }
}

/// Parameters for a short refined artifact.
#[must_use]
pub fn default_params() -> GenerationParams {
    GenerationParams::default().with_max_chars(DEFAULT_MAX_CHARS)
}

/// Runs the four refinement steps against `port`.
///
/// Each step is retried under `retry`.
pub async fn refine(
    port: &dyn GenerationPort,
    input: &WorkflowInput,
    params: &GenerationParams,
    retry: &RetryConfig,
) -> Result<RefinedArtifact, RefineError> {
    let span = tracing::info_span!("refine", input_len = input.content.len());

    async move {
        let hinted = with_retry(retry, "brainstorm", || port.brainstorm(input, params))
            .await
            .map_err(|e| RefineError::from_exhausted("brainstorm", e))?;
        debug!(topic = ?hinted.topic, style = ?hinted.style, "Brainstormed hints");

        let original = with_retry(retry, "create_artifact", || port.create_artifact(input, &hinted))
            .await
            .map_err(|e| RefineError::from_exhausted("create_artifact", e))?;

        let critique = with_retry(retry, "review_artifact", || {
            port.review_artifact(&original, input, &hinted)
        })
        .await
        .map_err(|e| RefineError::from_exhausted("review_artifact", e))?;

        let improved = with_retry(retry, "revise_artifact", || {
            port.revise_artifact(input, &original, &critique, &hinted)
        })
        .await
        .map_err(|e| RefineError::from_exhausted("revise_artifact", e))?;

        info!(
            original_words = original.word_count(),
            improved_words = improved.word_count(),
            "Refinement finished"
        );
        Ok(RefinedArtifact {
            original,
            improved,
            critique,
        })
    }
    .instrument(span)
    .await
}
