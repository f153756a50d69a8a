//! The capability that produces, revises and reviews artifacts.

use async_trait::async_trait;

use crate::core::{Artifact, AssessmentOutcome, GenerationParams, HumanFeedback, WorkflowInput};
use crate::errors::GenerationError;

/// Text generation as seen by the runner.
///
/// Implementations are stateless from the runner's point of view: every
/// call receives all the artifacts and feedback it depends on as
/// arguments. Prompt construction, model choice and transport belong to
/// the implementation.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Produces a first draft for `input`.
    async fn create_artifact(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError>;

    /// Produces a revision of `previous` guided by `feedback`.
    async fn revise_artifact(
        &self,
        input: &WorkflowInput,
        previous: &Artifact,
        feedback: &str,
        params: &GenerationParams,
    ) -> Result<Artifact, GenerationError>;

    /// Writes a review of an accepted artifact.
    async fn review_artifact(
        &self,
        artifact: &Artifact,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Interprets free-form feedback as an accept/revise decision.
    ///
    /// The default asks nothing of a model: it parses the feedback text
    /// with [`AssessmentOutcome::from_model_output`].
    async fn assess_feedback(
        &self,
        artifact: &Artifact,
        feedback: &HumanFeedback,
        input: &WorkflowInput,
    ) -> Result<AssessmentOutcome, GenerationError> {
        let _ = (artifact, input);
        Ok(AssessmentOutcome::from_model_output(&feedback.comments()))
    }

    /// Fills in topic and style hints before drafting.
    async fn brainstorm(
        &self,
        input: &WorkflowInput,
        params: &GenerationParams,
    ) -> Result<GenerationParams, GenerationError> {
        let _ = input;
        Ok(params.clone())
    }
}
