//! Durable storage of workflow instances.
//!
//! A suspended instance lives only in the store; the runner reloads it
//! when the matching resume call arrives.

#[cfg(feature = "file-store")]
mod file;
mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::runner::WorkflowInstance;
use crate::utils::{InstanceId, RequestId};

#[cfg(feature = "file-store")]
pub use file::FileWorkflowStore;
pub use memory::InMemoryWorkflowStore;

/// Storage backend for workflow instances.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Writes `instance` and returns its new version.
    ///
    /// The stored version must equal `instance.version` (0 for a new
    /// instance); otherwise the write is rejected with
    /// [`StoreError::Conflict`].
    async fn save(&self, instance: &WorkflowInstance) -> Result<u64, StoreError>;

    /// Loads an instance by id.
    async fn load(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError>;

    /// Finds the instance suspended on `request_id`.
    async fn find_by_request(&self, request_id: RequestId) -> Result<Option<InstanceId>, StoreError>;

    /// Removes an instance, returning it if present.
    async fn remove(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError>;

    /// Lists every stored instance.
    async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError>;
}

/// Returns the version a write must expect given what is stored.
pub(crate) fn check_version(
    instance: &WorkflowInstance,
    stored: Option<u64>,
) -> Result<u64, StoreError> {
    let found = stored.unwrap_or(0);
    if found == instance.version {
        Ok(found + 1)
    } else {
        Err(StoreError::Conflict {
            instance_id: instance.id,
            expected: instance.version,
            found,
        })
    }
}
