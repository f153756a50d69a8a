//! The persisted binding of an instance id to its current stage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::WorkflowResult;
use crate::engine::{Event, FailureReason, Stage, StageHistory};
use crate::utils::{now_utc, InstanceId, RequestId, Timestamp};

/// Lifecycle status of a [`WorkflowInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Being driven by the runner.
    Running,
    /// Waiting for the answer to `request_id`.
    Suspended {
        /// The pending request.
        request_id: RequestId,
    },
    /// Finished with a result.
    Completed,
    /// Failed; the stage is kept for diagnostics.
    Failed,
    /// The feedback request expired.
    Abandoned,
    /// Cancelled by a caller.
    Cancelled,
}

impl InstanceStatus {
    /// Returns the snake_case status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Suspended { .. } => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if the instance accepts no more events.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Abandoned | Self::Cancelled
        )
    }

    /// Returns the pending request id, if suspended.
    #[must_use]
    pub const fn pending_request(&self) -> Option<RequestId> {
        match self {
            Self::Suspended { request_id } => Some(*request_id),
            _ => None,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of the workflow from start input to a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance id.
    pub id: InstanceId,
    /// Lifecycle status.
    pub status: InstanceStatus,
    /// The single active stage.
    pub stage: Stage,
    /// Every event applied so far.
    pub history: StageHistory,
    /// Finalized result once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<WorkflowResult>,
    /// Why the instance stopped, if it did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Message of the error that stopped the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When the instance was created.
    pub created_at: Timestamp,
    /// When the instance was last written.
    pub updated_at: Timestamp,
    /// Store version, incremented on every save.
    #[serde(default)]
    pub version: u64,
}

impl WorkflowInstance {
    /// Creates a running instance from its initial stage.
    ///
    /// `start_event` is recorded as the first history entry.
    #[must_use]
    pub fn new(stage: Stage, start_event: Event) -> Self {
        let now = now_utc();
        let mut history = StageHistory::new();
        history.record(start_event, stage.kind());
        Self {
            id: stage.instance_id(),
            status: InstanceStatus::Running,
            stage,
            history,
            result: None,
            failure: None,
            last_error: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns true if the instance accepts no more events.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the pending request id, if suspended.
    #[must_use]
    pub const fn pending_request(&self) -> Option<RequestId> {
        self.status.pending_request()
    }

    /// Converts to a dictionary summary for diagnostics.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("instance_id".to_string(), serde_json::json!(self.id));
        map.insert("status".to_string(), serde_json::json!(self.status.as_str()));
        map.insert("stage".to_string(), serde_json::json!(self.stage.kind().as_str()));
        map.insert("cycle".to_string(), serde_json::json!(self.stage.cycle()));
        map.insert("events".to_string(), serde_json::json!(self.history.len()));
        map.insert("version".to_string(), serde_json::json!(self.version));
        if let Some(request_id) = self.pending_request() {
            map.insert("request_id".to_string(), serde_json::json!(request_id));
        }
        if let Some(ref error) = self.last_error {
            map.insert("last_error".to_string(), serde_json::json!(error));
        }
        map
    }
}
