//! Finalized workflow outputs.

use serde::{Deserialize, Serialize};

use super::{Artifact, HumanFeedback, WorkflowInput};
use crate::utils::{format_long_date, InstanceId, Timestamp};

/// The outcome of a workflow that reached `Done` and was reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// The instance that produced this result.
    pub instance_id: InstanceId,
    /// The originating input.
    pub input: WorkflowInput,
    /// The first draft.
    pub original_artifact: Artifact,
    /// The accepted artifact.
    pub artifact: Artifact,
    /// The final review text.
    pub review: String,
    /// Every piece of feedback received, oldest first.
    pub feedback: Vec<HumanFeedback>,
    /// Number of drafting cycles (1 = accepted first draft).
    pub cycles: u32,
    /// When the result was finalized.
    pub completed_at: Timestamp,
}

impl WorkflowResult {
    /// Returns true if the accepted artifact is the first draft.
    #[must_use]
    pub fn accepted_first_draft(&self) -> bool {
        self.cycles == 1
    }

    /// Renders a markdown report of the artifact and its review.
    ///
    /// If the review parameters carry a persona with a `name`, it is
    /// credited on the date line.
    #[must_use]
    pub fn render(&self, reviewer: Option<&serde_json::Value>) -> String {
        let date = format_long_date(&self.completed_at);
        let credit = reviewer
            .and_then(|persona| persona.get("name"))
            .and_then(serde_json::Value::as_str)
            .map_or(date.clone(), |name| format!("{name}, {date}"));

        format!(
            "# Story\n{}\n\n# Review\n{}\n\n# Reviewer\n{}",
            self.artifact.content.trim(),
            self.review.trim(),
            credit
        )
    }
}

/// Output of the single-pass refine workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedArtifact {
    /// The first written artifact.
    pub original: Artifact,
    /// The artifact rewritten after critique.
    pub improved: Artifact,
    /// The critique that drove the rewrite.
    pub critique: String,
}
