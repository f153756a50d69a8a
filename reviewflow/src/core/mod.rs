//! Core value types carried through a workflow.

mod artifact;
mod assessment;
mod feedback;
mod properties;
mod result;

pub use artifact::{Artifact, GenerationParams};
pub use assessment::AssessmentOutcome;
pub use feedback::{FeedbackRequest, FeedbackShape, FeedbackValue, HumanFeedback};
pub use properties::{Properties, WorkflowInput};
pub use result::{RefinedArtifact, WorkflowResult};
