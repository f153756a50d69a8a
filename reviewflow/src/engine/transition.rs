//! The transition function of the workflow state machine.
//!
//! | Stage              | Event                       | Result                      |
//! |--------------------|-----------------------------|-----------------------------|
//! | (start)            | `StartRequested`            | `Drafting`                  |
//! | `Drafting`         | `ArtifactProduced`          | `AwaitingFeedback`          |
//! | `AwaitingFeedback` | `FeedbackRequested`         | `AwaitingFeedback` (held)   |
//! | `AwaitingFeedback` | `FeedbackReceived`          | `Assessing`                 |
//! | `Assessing`        | `AssessmentMade(accept)`    | `Done`                      |
//! | `Assessing`        | `AssessmentMade(revise)`    | `Revising` or limit failure |
//! | `Revising`         | `ArtifactProduced`          | `AwaitingFeedback`          |
//! | `Done`             | `ReviewProduced`            | complete                    |
//! | generating stages  | `GenerationFailed`          | fail                        |
//! | any                | `Cancelled`                 | fail                        |

use serde::{Deserialize, Serialize};

use super::stage::{
    AssessingContext, AwaitingFeedbackContext, DoneContext, DraftingContext, RevisingContext,
    Stage, WorkflowContext,
};
use super::Event;
use crate::core::{AssessmentOutcome, WorkflowResult};
use crate::errors::{GenerationError, TransitionError};

/// What to do when an assessment cannot be parsed into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousAssessmentPolicy {
    /// Treat it as a request to revise.
    #[default]
    Revise,
    /// Fail the instance.
    Fail,
}

/// Bounds enforced by the transition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Maximum drafting cycles (first draft plus revisions) per instance.
    #[serde(default = "default_max_drafting_cycles")]
    pub max_drafting_cycles: u32,
    /// Handling of unparsable assessments.
    #[serde(default)]
    pub ambiguous_assessment: AmbiguousAssessmentPolicy,
}

const fn default_max_drafting_cycles() -> u32 {
    10
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_drafting_cycles: default_max_drafting_cycles(),
            ambiguous_assessment: AmbiguousAssessmentPolicy::default(),
        }
    }
}

impl EngineLimits {
    /// Sets the maximum number of drafting cycles (at least 1).
    #[must_use]
    pub fn with_max_drafting_cycles(mut self, cycles: u32) -> Self {
        self.max_drafting_cycles = cycles.max(1);
        self
    }

    /// Sets the ambiguous assessment policy.
    #[must_use]
    pub const fn with_ambiguous_assessment(mut self, policy: AmbiguousAssessmentPolicy) -> Self {
        self.ambiguous_assessment = policy;
        self
    }
}

/// Why an instance failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Generation failed after retries.
    Generation {
        /// The final error.
        error: GenerationError,
    },
    /// The revise loop hit the cycle bound.
    RevisionLimitExceeded {
        /// Drafting cycles completed.
        cycles: u32,
    },
    /// The assessment could not be parsed and the policy is `Fail`.
    AmbiguousAssessment {
        /// The raw assessment text.
        raw: String,
    },
    /// The instance was cancelled.
    Cancelled {
        /// Why.
        reason: String,
    },
}

/// The result of applying an event to a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Move to the given stage.
    Advance(Stage),
    /// The workflow finished with a result.
    Complete(Box<WorkflowResult>),
    /// The workflow failed; the current stage is kept for diagnostics.
    Fail(FailureReason),
}

impl Transition {
    /// Returns the next stage if the transition advances.
    #[must_use]
    pub const fn next_stage(&self) -> Option<&Stage> {
        match self {
            Self::Advance(stage) => Some(stage),
            _ => None,
        }
    }

    /// Returns true if the workflow ends here.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Advance(_))
    }
}

/// Pure transition function over [`Stage`] and [`Event`].
///
/// The engine only reads the stage and event it is given and its own
/// immutable limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionEngine {
    limits: EngineLimits,
}

impl TransitionEngine {
    /// Creates an engine with the given limits.
    #[must_use]
    pub const fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Builds the initial stage from a `StartRequested` event.
    pub fn start(&self, event: Event) -> Result<Stage, TransitionError> {
        match event {
            Event::StartRequested {
                instance_id,
                input,
                properties,
            } => Ok(Stage::Drafting(DraftingContext {
                workflow: WorkflowContext {
                    instance_id,
                    input,
                    properties,
                },
                cycle: 1,
            })),
            other => Err(TransitionError::invalid(None, other.name())),
        }
    }

    /// Applies `event` to `stage`.
    ///
    /// `stage` is left untouched; the result holds a new stage value.
    pub fn apply(&self, stage: &Stage, event: Event) -> Result<Transition, TransitionError> {
        match (stage, event) {
            (_, Event::Cancelled { reason }) => {
                Ok(Transition::Fail(FailureReason::Cancelled { reason }))
            }

            (
                Stage::Drafting(_) | Stage::Assessing(_) | Stage::Revising(_) | Stage::Done(_),
                Event::GenerationFailed { error },
            ) => Ok(Transition::Fail(FailureReason::Generation { error })),

            (Stage::Drafting(ctx), Event::ArtifactProduced { artifact }) => {
                Ok(Transition::Advance(Stage::AwaitingFeedback(AwaitingFeedbackContext {
                    workflow: ctx.workflow.clone(),
                    original_artifact: artifact.clone(),
                    artifact,
                    cycle: ctx.cycle,
                    feedback_history: Vec::new(),
                    pending_request: None,
                })))
            }

            (Stage::AwaitingFeedback(ctx), Event::FeedbackRequested { request }) => {
                if ctx.pending_request.is_some() {
                    return Err(TransitionError::invalid(Some(stage.kind()), "FeedbackRequested"));
                }
                Ok(Transition::Advance(Stage::AwaitingFeedback(AwaitingFeedbackContext {
                    pending_request: Some(request),
                    ..ctx.clone()
                })))
            }

            (Stage::AwaitingFeedback(ctx), Event::FeedbackReceived { feedback }) => {
                let expected = ctx.pending_request.as_ref().map(|r| r.id);
                if expected != Some(feedback.request_id) {
                    return Err(TransitionError::RequestMismatch {
                        expected,
                        received: feedback.request_id,
                    });
                }
                Ok(Transition::Advance(Stage::Assessing(AssessingContext {
                    workflow: ctx.workflow.clone(),
                    artifact: ctx.artifact.clone(),
                    original_artifact: ctx.original_artifact.clone(),
                    cycle: ctx.cycle,
                    feedback,
                    feedback_history: ctx.feedback_history.clone(),
                })))
            }

            (Stage::Assessing(ctx), Event::AssessmentMade { outcome }) => Ok(self.assess(ctx, outcome)),

            (Stage::Revising(ctx), Event::ArtifactProduced { artifact }) => {
                Ok(Transition::Advance(Stage::AwaitingFeedback(AwaitingFeedbackContext {
                    workflow: ctx.workflow.clone(),
                    artifact,
                    original_artifact: ctx.original_artifact.clone(),
                    cycle: ctx.cycle + 1,
                    feedback_history: ctx.feedback_history.clone(),
                    pending_request: None,
                })))
            }

            (
                Stage::Done(ctx),
                Event::ReviewProduced {
                    review,
                    completed_at,
                },
            ) => Ok(Transition::Complete(Box::new(WorkflowResult {
                instance_id: ctx.workflow.instance_id,
                input: ctx.workflow.input.clone(),
                original_artifact: ctx.original_artifact.clone(),
                artifact: ctx.artifact.clone(),
                review,
                feedback: ctx.feedback_history.clone(),
                cycles: ctx.cycle,
                completed_at,
            }))),

            (stage, event) => Err(TransitionError::invalid(Some(stage.kind()), event.name())),
        }
    }

    fn assess(&self, ctx: &AssessingContext, outcome: AssessmentOutcome) -> Transition {
        let accept = match outcome {
            AssessmentOutcome::Decided { accept } => accept,
            AssessmentOutcome::Unparsable { raw } => match self.limits.ambiguous_assessment {
                AmbiguousAssessmentPolicy::Revise => false,
                AmbiguousAssessmentPolicy::Fail => {
                    return Transition::Fail(FailureReason::AmbiguousAssessment { raw });
                }
            },
        };

        let mut feedback_history = ctx.feedback_history.clone();
        feedback_history.push(ctx.feedback.clone());

        if accept {
            return Transition::Advance(Stage::Done(DoneContext {
                workflow: ctx.workflow.clone(),
                artifact: ctx.artifact.clone(),
                original_artifact: ctx.original_artifact.clone(),
                cycle: ctx.cycle,
                feedback_history,
            }));
        }

        if ctx.cycle >= self.limits.max_drafting_cycles {
            return Transition::Fail(FailureReason::RevisionLimitExceeded { cycles: ctx.cycle });
        }

        Transition::Advance(Stage::Revising(RevisingContext {
            workflow: ctx.workflow.clone(),
            artifact: ctx.artifact.clone(),
            original_artifact: ctx.original_artifact.clone(),
            cycle: ctx.cycle,
            feedback: ctx.feedback.clone(),
            feedback_history,
        }))
    }
}
