use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;

use super::{StorageError, StorageGateway};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// In-process gateway. Contents are lost on restart, so it is meant for local runs and tests.
///
/// Failures can be injected per operation to exercise error paths.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    failing_gets: HashSet<String>,
    failing_saves: HashSet<String>,
    fail_list: bool,
    unhealthy: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_get(mut self, name: &str) -> Self {
        self.failing_gets.insert(name.to_string());
        self
    }

    pub fn with_failing_save(mut self, name: &str) -> Self {
        self.failing_saves.insert(name.to_string());
        self
    }

    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn with_unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn content_type_of(&self, name: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(name)
            .map(|object| object.content_type.clone())
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn save(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        if self.failing_saves.contains(name) {
            return Err(StorageError::OperationFailed(format!(
                "injected save failure for {name}"
            )));
        }

        info!(
            object_name = name,
            size = data.len(),
            content_type,
            "storing object in memory"
        );
        let object = StoredObject {
            data,
            content_type: content_type.to_string(),
        };
        self.objects.write().await.insert(name.to_string(), object);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        if self.failing_gets.contains(name) {
            return Err(StorageError::OperationFailed(format!(
                "injected get failure for {name}"
            )));
        }

        self.objects
            .read()
            .await
            .get(name)
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        if self.fail_list {
            return Err(StorageError::OperationFailed(
                "injected list failure".to_string(),
            ));
        }

        Ok(self.objects.read().await.keys().cloned().collect())
    }

    async fn check_health(&self) -> bool {
        !self.unhealthy
    }
}
