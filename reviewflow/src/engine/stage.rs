//! Workflow stages and the context each one carries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{Artifact, FeedbackRequest, HumanFeedback, Properties, WorkflowInput};
use crate::utils::InstanceId;

/// The variant tag of a [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Producing the first draft.
    Drafting,
    /// Suspended until a human supplies feedback.
    AwaitingFeedback,
    /// Deciding whether the feedback accepts the artifact.
    Assessing,
    /// Producing a revised artifact from feedback.
    Revising,
    /// Accepted; waiting for the final review.
    Done,
}

impl StageKind {
    /// Returns the snake_case name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::AwaitingFeedback => "awaiting_feedback",
            Self::Assessing => "assessing",
            Self::Revising => "revising",
            Self::Done => "done",
        }
    }

    /// Returns true if the runner must call the generation port in this stage.
    #[must_use]
    pub const fn requires_generation(self) -> bool {
        matches!(self, Self::Drafting | Self::Assessing | Self::Revising | Self::Done)
    }

    /// Returns true if the runner must suspend for human input in this stage.
    #[must_use]
    pub const fn requires_human_input(self) -> bool {
        matches!(self, Self::AwaitingFeedback)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context shared by every stage of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// The owning instance.
    pub instance_id: InstanceId,
    /// The originating input.
    pub input: WorkflowInput,
    /// The workflow properties.
    pub properties: Properties,
}

/// Context of the [`Stage::Drafting`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftingContext {
    /// Shared workflow context.
    pub workflow: WorkflowContext,
    /// Drafting cycle, starting at 1.
    pub cycle: u32,
}

/// Context of the [`Stage::AwaitingFeedback`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwaitingFeedbackContext {
    /// Shared workflow context.
    pub workflow: WorkflowContext,
    /// The artifact under review.
    pub artifact: Artifact,
    /// The first draft.
    pub original_artifact: Artifact,
    /// Drafting cycle that produced `artifact`.
    pub cycle: u32,
    /// Feedback from earlier cycles, oldest first.
    pub feedback_history: Vec<HumanFeedback>,
    /// The emitted request, once the runner has suspended.
    pub pending_request: Option<FeedbackRequest>,
}

/// Context of the [`Stage::Assessing`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessingContext {
    /// Shared workflow context.
    pub workflow: WorkflowContext,
    /// The artifact under review.
    pub artifact: Artifact,
    /// The first draft.
    pub original_artifact: Artifact,
    /// Drafting cycle that produced `artifact`.
    pub cycle: u32,
    /// The feedback being assessed.
    pub feedback: HumanFeedback,
    /// Feedback from earlier cycles, oldest first.
    pub feedback_history: Vec<HumanFeedback>,
}

/// Context of the [`Stage::Revising`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisingContext {
    /// Shared workflow context.
    pub workflow: WorkflowContext,
    /// The artifact being revised.
    pub artifact: Artifact,
    /// The first draft.
    pub original_artifact: Artifact,
    /// Drafting cycle that produced `artifact`.
    pub cycle: u32,
    /// The feedback driving this revision.
    pub feedback: HumanFeedback,
    /// All feedback received so far, including `feedback`.
    pub feedback_history: Vec<HumanFeedback>,
}

/// Context of the [`Stage::Done`] stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoneContext {
    /// Shared workflow context.
    pub workflow: WorkflowContext,
    /// The accepted artifact.
    pub artifact: Artifact,
    /// The first draft.
    pub original_artifact: Artifact,
    /// Drafting cycle that produced `artifact`.
    pub cycle: u32,
    /// All feedback received, oldest first.
    pub feedback_history: Vec<HumanFeedback>,
}

/// One state of the workflow state machine.
///
/// Exactly one stage is active per instance. Transitions build a new stage
/// value; an existing stage is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "context", rename_all = "snake_case")]
pub enum Stage {
    /// Producing the first draft.
    Drafting(DraftingContext),
    /// Suspended until a human supplies feedback.
    AwaitingFeedback(AwaitingFeedbackContext),
    /// Deciding whether the feedback accepts the artifact.
    Assessing(AssessingContext),
    /// Producing a revised artifact from feedback.
    Revising(RevisingContext),
    /// Accepted; waiting for the final review.
    Done(DoneContext),
}

impl Stage {
    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::Drafting(_) => StageKind::Drafting,
            Self::AwaitingFeedback(_) => StageKind::AwaitingFeedback,
            Self::Assessing(_) => StageKind::Assessing,
            Self::Revising(_) => StageKind::Revising,
            Self::Done(_) => StageKind::Done,
        }
    }

    /// Returns the shared workflow context.
    #[must_use]
    pub const fn workflow(&self) -> &WorkflowContext {
        match self {
            Self::Drafting(ctx) => &ctx.workflow,
            Self::AwaitingFeedback(ctx) => &ctx.workflow,
            Self::Assessing(ctx) => &ctx.workflow,
            Self::Revising(ctx) => &ctx.workflow,
            Self::Done(ctx) => &ctx.workflow,
        }
    }

    /// Returns the owning instance id.
    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.workflow().instance_id
    }

    /// Returns the current artifact, if one has been produced.
    #[must_use]
    pub const fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Drafting(_) => None,
            Self::AwaitingFeedback(ctx) => Some(&ctx.artifact),
            Self::Assessing(ctx) => Some(&ctx.artifact),
            Self::Revising(ctx) => Some(&ctx.artifact),
            Self::Done(ctx) => Some(&ctx.artifact),
        }
    }

    /// Returns the drafting cycle.
    #[must_use]
    pub const fn cycle(&self) -> u32 {
        match self {
            Self::Drafting(ctx) => ctx.cycle,
            Self::AwaitingFeedback(ctx) => ctx.cycle,
            Self::Assessing(ctx) => ctx.cycle,
            Self::Revising(ctx) => ctx.cycle,
            Self::Done(ctx) => ctx.cycle,
        }
    }

    /// Returns the pending feedback request, if suspended.
    #[must_use]
    pub const fn pending_request(&self) -> Option<&FeedbackRequest> {
        match self {
            Self::AwaitingFeedback(ctx) => ctx.pending_request.as_ref(),
            _ => None,
        }
    }
}
