//! File-backed workflow store: one JSON document per instance.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{check_version, WorkflowStore};
use crate::errors::StoreError;
use crate::runner::WorkflowInstance;
use crate::utils::{InstanceId, RequestId};

/// Stores each instance as `<dir>/<instance_id>.json`.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash mid-write leaves the previous checkpoint intact. Saves are
/// serialized so the version check and the rename commit together.
#[derive(Debug)]
pub struct FileWorkflowStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileWorkflowStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: InstanceId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(path: &Path) -> Result<Option<WorkflowInstance>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl WorkflowStore for FileWorkflowStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(instance.id);
        let stored = Self::read(&path).await?.map(|i| i.version);
        let version = check_version(instance, stored)?;

        let body = serde_json::to_vec_pretty(&WorkflowInstance {
            version,
            ..instance.clone()
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::trace!(instance_id = %instance.id, version, "Checkpoint written");
        Ok(version)
    }

    async fn load(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        Self::read(&self.path_for(id)).await
    }

    async fn find_by_request(&self, request_id: RequestId) -> Result<Option<InstanceId>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|i| i.pending_request() == Some(request_id))
            .map(|i| i.id))
    }

    async fn remove(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        let path = self.path_for(id);
        let existing = Self::read(&path).await?;
        if existing.is_some() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(existing)
    }

    async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        let mut instances = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(instance) = Self::read(&path).await? {
                instances.push(instance);
            }
        }
        instances.sort_by_key(|i| i.created_at);
        Ok(instances)
    }
}
