//! Error types for the reviewflow engine.
//!
//! Each collaborator boundary has its own error enum; [`WorkflowError`] is
//! what the runner's entry points surface to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::engine::StageKind;
use crate::utils::{InstanceId, RequestId};

/// Failure of a call into the generation port.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationError {
    /// The underlying model call errored.
    #[error("Generation backend error: {message}")]
    Backend {
        /// Error description from the backend.
        message: String,
    },

    /// The model answered but the output does not have the expected shape.
    #[error("Malformed generation output: {message}")]
    MalformedOutput {
        /// What was wrong with the output.
        message: String,
    },

    /// The call did not finish within the configured bound.
    #[error("Generation timed out after {after_ms}ms")]
    Timeout {
        /// The bound that elapsed, in milliseconds.
        after_ms: u64,
    },
}

impl GenerationError {
    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a malformed output error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub const fn timeout(after_ms: u64) -> Self {
        Self::Timeout { after_ms }
    }
}

impl From<anyhow::Error> for GenerationError {
    fn from(err: anyhow::Error) -> Self {
        Self::backend(format!("{err:#}"))
    }
}

/// Failure at the human feedback boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    /// The supplied value does not satisfy the request's expected shape.
    #[error("Malformed feedback: {reason}")]
    Malformed {
        /// Why the value was rejected.
        reason: String,
    },

    /// No response arrived before the request's deadline.
    #[error("Feedback request {request_id} timed out")]
    Timeout {
        /// The expired request.
        request_id: RequestId,
    },

    /// The request id is not pending at the port.
    #[error("Unknown feedback request: {request_id}")]
    UnknownRequest {
        /// The unknown request.
        request_id: RequestId,
    },
}

impl FeedbackError {
    /// Creates a malformed feedback error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// An event that the transition table does not accept for the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not valid for the stage.
    #[error("Event '{event}' is not valid in stage '{}'", stage_label(.stage))]
    InvalidEvent {
        /// The stage the event was applied to, `None` before start.
        stage: Option<StageKind>,
        /// The event name.
        event: String,
    },

    /// Feedback arrived for a request other than the pending one.
    #[error("Feedback for request {received} does not match pending request {expected:?}")]
    RequestMismatch {
        /// The pending request, if any.
        expected: Option<RequestId>,
        /// The request the feedback answers.
        received: RequestId,
    },
}

fn stage_label(stage: &Option<StageKind>) -> &'static str {
    stage.map_or("start", StageKind::as_str)
}

impl TransitionError {
    /// Creates an invalid event error.
    #[must_use]
    pub fn invalid(stage: Option<StageKind>, event: impl Into<String>) -> Self {
        Self::InvalidEvent {
            stage,
            event: event.into(),
        }
    }
}

/// Failure of the workflow store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error from a file-backed store.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write raced with another write of the same instance.
    #[error("Version conflict for instance {instance_id}: expected {expected}, found {found}")]
    Conflict {
        /// The instance being written.
        instance_id: InstanceId,
        /// The version the writer read.
        expected: u64,
        /// The version currently stored.
        found: u64,
    },
}

/// The main error type returned by the workflow runner.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Resume named a request that no suspended instance is waiting on.
    #[error("Unknown request: {request_id}")]
    UnknownRequest {
        /// The request id supplied to resume.
        request_id: RequestId,
    },

    /// Resume value did not match the expected shape; the instance stays suspended.
    #[error("Malformed feedback for request {request_id}: {reason}")]
    FeedbackMalformed {
        /// The request being answered.
        request_id: RequestId,
        /// Why the value was rejected.
        reason: String,
    },

    /// The feedback request expired; the instance is abandoned.
    #[error("Feedback for instance {instance_id} timed out (request {request_id})")]
    FeedbackTimeout {
        /// The abandoned instance.
        instance_id: InstanceId,
        /// The expired request.
        request_id: RequestId,
    },

    /// Generation kept failing after every retry.
    #[error("Generation failed for instance {instance_id} after {attempts} attempts: {last}")]
    GenerationExhausted {
        /// The failed instance.
        instance_id: InstanceId,
        /// Number of attempts made.
        attempts: usize,
        /// The error from the final attempt.
        last: GenerationError,
    },

    /// The revise loop hit the configured cycle bound.
    #[error("Instance {instance_id} exceeded the limit of {cycles} drafting cycles")]
    RevisionLimitExceeded {
        /// The failed instance.
        instance_id: InstanceId,
        /// Drafting cycles completed.
        cycles: u32,
    },

    /// The assessment could not be parsed and the policy forbids defaulting.
    #[error("Ambiguous assessment for instance {instance_id}: {raw}")]
    AmbiguousAssessment {
        /// The failed instance.
        instance_id: InstanceId,
        /// The unparsable assessment text.
        raw: String,
    },

    /// The instance was cancelled.
    #[error("Instance {instance_id} cancelled: {reason}")]
    Cancelled {
        /// The cancelled instance.
        instance_id: InstanceId,
        /// Cancellation reason.
        reason: String,
    },

    /// No instance exists with this id.
    #[error("Unknown instance: {instance_id}")]
    UnknownInstance {
        /// The id looked up.
        instance_id: InstanceId,
    },

    /// The instance has not reached a terminal stage.
    #[error("Instance {instance_id} is not finished (status: {status})")]
    NotFinished {
        /// The instance looked up.
        instance_id: InstanceId,
        /// Its current status.
        status: String,
    },

    /// The instance is in a terminal status and accepts no more events.
    #[error("Instance {instance_id} is closed (status: {status})")]
    InstanceClosed {
        /// The instance.
        instance_id: InstanceId,
        /// Its terminal status.
        status: String,
    },

    /// An event was rejected by the transition engine.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// A feedback port error not covered by the variants above.
    #[error("{0}")]
    Feedback(#[from] FeedbackError),

    /// A store error.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownRequest { .. } => "UNKNOWN_REQUEST",
            Self::FeedbackMalformed { .. } => "FEEDBACK_MALFORMED",
            Self::FeedbackTimeout { .. } => "FEEDBACK_TIMEOUT",
            Self::GenerationExhausted { .. } => "GENERATION_FAILURE",
            Self::RevisionLimitExceeded { .. } => "REVISION_LIMIT",
            Self::AmbiguousAssessment { .. } => "AMBIGUOUS_ASSESSMENT",
            Self::Cancelled { .. } => "CANCELLED",
            Self::UnknownInstance { .. } => "UNKNOWN_INSTANCE",
            Self::NotFinished { .. } => "NOT_FINISHED",
            Self::InstanceClosed { .. } => "INSTANCE_CLOSED",
            Self::Transition(_) => "INVALID_TRANSITION",
            Self::Feedback(_) => "FEEDBACK_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if the instance is left unchanged and can still be resumed.
    #[must_use]
    pub const fn leaves_instance_suspended(&self) -> bool {
        matches!(
            self,
            Self::UnknownRequest { .. } | Self::FeedbackMalformed { .. }
        )
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::UnknownRequest { request_id } => {
                map.insert("request_id".to_string(), serde_json::json!(request_id));
            }
            Self::FeedbackMalformed { request_id, reason } => {
                map.insert("request_id".to_string(), serde_json::json!(request_id));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::FeedbackTimeout {
                instance_id,
                request_id,
            } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("request_id".to_string(), serde_json::json!(request_id));
            }
            Self::GenerationExhausted {
                instance_id,
                attempts,
                last,
            } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("attempts".to_string(), serde_json::json!(attempts));
                map.insert("last_error".to_string(), serde_json::json!(last));
            }
            Self::RevisionLimitExceeded {
                instance_id,
                cycles,
            } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("cycles".to_string(), serde_json::json!(cycles));
            }
            Self::AmbiguousAssessment { instance_id, raw } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("raw".to_string(), serde_json::json!(raw));
            }
            Self::Cancelled {
                instance_id,
                reason,
            } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::UnknownInstance { instance_id } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
            }
            Self::NotFinished {
                instance_id,
                status,
            }
            | Self::InstanceClosed {
                instance_id,
                status,
            } => {
                map.insert("instance_id".to_string(), serde_json::json!(instance_id));
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::Transition(_) | Self::Feedback(_) | Self::Store(_) => {}
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::timeout(1500);
        assert_eq!(err.to_string(), "Generation timed out after 1500ms");
    }

    #[test]
    fn test_generation_error_from_anyhow() {
        let err: GenerationError = anyhow::anyhow!("rate limited").context("calling model").into();
        match err {
            GenerationError::Backend { message } => {
                assert!(message.contains("calling model"));
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_generation_error_serializes_tagged() {
        let json = serde_json::to_value(GenerationError::malformed("not json")).unwrap();
        assert_eq!(json["kind"], "malformed_output");
        assert_eq!(json["message"], "not json");
    }

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError::invalid(Some(StageKind::Done), "FeedbackReceived");
        assert_eq!(
            err.to_string(),
            "Event 'FeedbackReceived' is not valid in stage 'done'"
        );
    }

    #[test]
    fn test_workflow_error_to_dict() {
        let request_id = RequestId::new();
        let err = WorkflowError::UnknownRequest { request_id };
        let dict = err.to_dict();

        assert_eq!(dict.get("code").unwrap(), "UNKNOWN_REQUEST");
        assert_eq!(
            dict.get("request_id").unwrap(),
            &serde_json::json!(request_id)
        );
        assert!(err.leaves_instance_suspended());
    }

    #[test]
    fn test_generation_exhausted_to_dict() {
        let err = WorkflowError::GenerationExhausted {
            instance_id: InstanceId::new(),
            attempts: 3,
            last: GenerationError::backend("boom"),
        };
        let dict = err.to_dict();

        assert_eq!(dict.get("code").unwrap(), "GENERATION_FAILURE");
        assert_eq!(dict.get("attempts").unwrap(), 3);
        assert_eq!(dict["last_error"]["kind"], "backend");
        assert!(!err.leaves_instance_suspended());
    }
}
