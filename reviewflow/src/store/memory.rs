//! In-memory workflow store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{check_version, WorkflowStore};
use crate::errors::StoreError;
use crate::runner::WorkflowInstance;
use crate::utils::{InstanceId, RequestId};

/// Keeps instances in a concurrent map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    instances: DashMap<InstanceId, WorkflowInstance>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<u64, StoreError> {
        match self.instances.entry(instance.id) {
            Entry::Occupied(mut entry) => {
                let version = check_version(instance, Some(entry.get().version))?;
                entry.insert(WorkflowInstance {
                    version,
                    ..instance.clone()
                });
                Ok(version)
            }
            Entry::Vacant(entry) => {
                let version = check_version(instance, None)?;
                entry.insert(WorkflowInstance {
                    version,
                    ..instance.clone()
                });
                Ok(version)
            }
        }
    }

    async fn load(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self.instances.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_request(&self, request_id: RequestId) -> Result<Option<InstanceId>, StoreError> {
        Ok(self
            .instances
            .iter()
            .find(|e| e.pending_request() == Some(request_id))
            .map(|e| *e.key()))
    }

    async fn remove(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self.instances.remove(&id).map(|(_, instance)| instance))
    }

    async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        Ok(self.instances.iter().map(|e| e.value().clone()).collect())
    }
}
