//! Events fed into the transition engine.

use serde::{Deserialize, Serialize};

use crate::core::{Artifact, AssessmentOutcome, FeedbackRequest, HumanFeedback, Properties, WorkflowInput};
use crate::errors::GenerationError;
use crate::utils::{InstanceId, Timestamp};

/// Something that happened to a workflow instance.
///
/// Events carry every value a transition needs, including timestamps, so
/// that applying the same event to the same stage always yields the same
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A caller started a new instance.
    StartRequested {
        /// The new instance's id.
        instance_id: InstanceId,
        /// The originating input.
        input: WorkflowInput,
        /// Workflow properties.
        properties: Properties,
    },
    /// The generation port produced a draft or revision.
    ArtifactProduced {
        /// The new artifact.
        artifact: Artifact,
    },
    /// The generation port failed and retries were exhausted.
    GenerationFailed {
        /// The final error.
        error: GenerationError,
    },
    /// A feedback request was emitted and the instance suspended.
    FeedbackRequested {
        /// The emitted request.
        request: FeedbackRequest,
    },
    /// A human answered the pending request.
    FeedbackReceived {
        /// The supplied feedback.
        feedback: HumanFeedback,
    },
    /// The assessment of the feedback completed.
    AssessmentMade {
        /// The verdict.
        outcome: AssessmentOutcome,
    },
    /// The final review was produced.
    ReviewProduced {
        /// The review text.
        review: String,
        /// When the workflow completed.
        completed_at: Timestamp,
    },
    /// The instance was cancelled.
    Cancelled {
        /// Why.
        reason: String,
    },
}

impl Event {
    /// Returns the event name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartRequested { .. } => "StartRequested",
            Self::ArtifactProduced { .. } => "ArtifactProduced",
            Self::GenerationFailed { .. } => "GenerationFailed",
            Self::FeedbackRequested { .. } => "FeedbackRequested",
            Self::FeedbackReceived { .. } => "FeedbackReceived",
            Self::AssessmentMade { .. } => "AssessmentMade",
            Self::ReviewProduced { .. } => "ReviewProduced",
            Self::Cancelled { .. } => "Cancelled",
        }
    }

    /// Creates an `ArtifactProduced` event.
    #[must_use]
    pub const fn artifact_produced(artifact: Artifact) -> Self {
        Self::ArtifactProduced { artifact }
    }

    /// Creates a `FeedbackReceived` event.
    #[must_use]
    pub const fn feedback_received(feedback: HumanFeedback) -> Self {
        Self::FeedbackReceived { feedback }
    }

    /// Creates an `AssessmentMade` event.
    #[must_use]
    pub const fn assessment_made(outcome: AssessmentOutcome) -> Self {
        Self::AssessmentMade { outcome }
    }
}
