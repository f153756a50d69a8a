//! The workflow state machine.
//!
//! [`TransitionEngine::apply`] is a pure function of a [`Stage`] and an
//! [`Event`]. Everything with side effects lives in the runner.

mod event;
mod history;
mod stage;
mod transition;

pub use event::Event;
pub use history::{replay, HistoryEntry, StageHistory};
pub use stage::{
    AssessingContext, AwaitingFeedbackContext, DoneContext, DraftingContext, RevisingContext,
    Stage, StageKind, WorkflowContext,
};
pub use transition::{
    AmbiguousAssessmentPolicy, EngineLimits, FailureReason, Transition, TransitionEngine,
};
