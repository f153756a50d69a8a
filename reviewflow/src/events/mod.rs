//! Lifecycle events emitted by the runner.
//!
//! Events complement `tracing` output: they are structured records a host
//! application can route to analytics or a UI, one per lifecycle step.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, WorkflowEvent};

/// An instance was created.
pub const WORKFLOW_STARTED: &str = "workflow.started";
/// An instance moved to a new stage.
pub const WORKFLOW_STAGE_ENTERED: &str = "workflow.stage_entered";
/// An instance suspended awaiting feedback.
pub const WORKFLOW_SUSPENDED: &str = "workflow.suspended";
/// A suspended instance received feedback.
pub const WORKFLOW_RESUMED: &str = "workflow.resumed";
/// An instance finished with a result.
pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
/// An instance failed or was abandoned.
pub const WORKFLOW_FAILED: &str = "workflow.failed";
/// An instance was cancelled.
pub const WORKFLOW_CANCELLED: &str = "workflow.cancelled";
/// A generation call is being retried.
pub const GENERATION_RETRY: &str = "generation.retry";
