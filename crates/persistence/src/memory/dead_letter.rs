use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::DeadLetterEntry;

use crate::store::{DeadLetterStore, StoreError};

/// Append-only; entries are kept in quarantine order.
#[derive(Default)]
pub struct InMemoryDeadLetterStore {
    entries: RwLock<Vec<DeadLetterEntry>>,
}

impl InMemoryDeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn append(&self, entry: &DeadLetterEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.webhook_id() == webhook_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }
}
