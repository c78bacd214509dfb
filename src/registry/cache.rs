use super::types::{ModelDescriptor, ModelStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory model cache owned by one client
///
/// Two independent maps keyed by model id. Entries are created on first
/// observation and updated in place; nothing is ever evicted. Locks are only
/// held for the duration of a single map access.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    descriptors: RwLock<HashMap<String, ModelDescriptor>>,
    statuses: RwLock<HashMap<String, ModelStatus>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn descriptor(&self, id: &str) -> Option<ModelDescriptor> {
        self.descriptors.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.descriptors.read().await.contains_key(id)
    }

    /// Returns the cached descriptor, inserting `create()` when absent
    pub async fn descriptor_or_insert_with<F>(&self, id: &str, create: F) -> ModelDescriptor
    where
        F: FnOnce() -> ModelDescriptor,
    {
        self.descriptors
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(create)
            .clone()
    }

    pub async fn insert_descriptor(&self, descriptor: ModelDescriptor) {
        self.descriptors
            .write()
            .await
            .insert(descriptor.id.clone(), descriptor);
    }

    /// Mutates the descriptor for `id`, creating a default one first
    pub async fn update_descriptor<F>(&self, id: &str, update: F)
    where
        F: FnOnce(&mut ModelDescriptor),
    {
        let mut descriptors = self.descriptors.write().await;
        let descriptor = descriptors
            .entry(id.to_string())
            .or_insert_with(|| ModelDescriptor::synthesized(id));
        update(descriptor);
    }

    pub async fn descriptor_count(&self) -> usize {
        self.descriptors.read().await.len()
    }

    /// Cached status, or the default for a model never observed
    pub async fn status(&self, id: &str) -> ModelStatus {
        self.statuses
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn cached_status(&self, id: &str) -> Option<ModelStatus> {
        self.statuses.read().await.get(id).cloned()
    }

    pub async fn set_status(&self, id: &str, status: ModelStatus) {
        self.statuses.write().await.insert(id.to_string(), status);
    }
}
