//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

use crate::utils::{iso_timestamp, InstanceId};

/// A lifecycle notification about one workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Event type, e.g. `workflow.suspended`.
    pub event_type: String,
    /// The instance the event concerns.
    pub instance_id: InstanceId,
    /// Event-specific payload.
    pub data: serde_json::Value,
    /// When the event was emitted (ISO 8601).
    pub timestamp: String,
}

impl WorkflowEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: impl Into<String>, instance_id: InstanceId, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            instance_id,
            data,
            timestamp: iso_timestamp(),
        }
    }
}

/// Receives lifecycle events from the runner.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: WorkflowEvent);

    /// Emits an event without blocking. Must never fail.
    fn try_emit(&self, event: WorkflowEvent);
}

/// Discards every event. Used when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: WorkflowEvent) {}

    fn try_emit(&self, _event: WorkflowEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at `level` (DEBUG or INFO).
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &WorkflowEvent) {
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                instance_id = %event.instance_id,
                event_data = %event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                instance_id = %event.instance_id,
                event_data = %event.data,
                "Event: {}", event.event_type
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: WorkflowEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: WorkflowEvent) {
        self.log_event(&event);
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<WorkflowEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns events whose type starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<WorkflowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the events concerning one instance.
    #[must_use]
    pub fn events_for(&self, instance_id: InstanceId) -> Vec<WorkflowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.instance_id == instance_id)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: WorkflowEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: WorkflowEvent) {
        self.events.write().push(event);
    }
}
