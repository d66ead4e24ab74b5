use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::DeliveryLogEntry;

use crate::store::{DeliveryLogStore, StoreError};

#[derive(Default)]
pub struct InMemoryDeliveryLogStore {
    entries: RwLock<Vec<DeliveryLogEntry>>,
}

impl InMemoryDeliveryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryLogStore for InMemoryDeliveryLogStore {
    async fn append(&self, entry: &DeliveryLogEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DeliveryLogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.webhook_id == webhook_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>, StoreError> {
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

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.attempted_at >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::models::{Delivery, DeliveryOutcome, Event};
    use serde_json::json;

    fn create_test_entry(webhook_id: Uuid, at: DateTime<Utc>) -> DeliveryLogEntry {
        let event = Event::new("booking.created", json!({}), json!({}));
        let delivery = Delivery::new(webhook_id, event.id, 5);
        DeliveryLogEntry::from_attempt(
            &delivery,
            &event,
            &DeliveryOutcome::from_status(200),
            12,
            at,
        )
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let store = InMemoryDeliveryLogStore::new();
        let webhook_id = Uuid::new_v4();
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            let entry = create_test_entry(webhook_id, now + Duration::seconds(i));
            ids.push(entry.id);
            store.append(&entry).await.unwrap();
        }
        store
            .append(&create_test_entry(Uuid::new_v4(), now))
            .await
            .unwrap();

        let entries = store.list(webhook_id, 3).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, ids[4]);
        assert_eq!(entries[2].id, ids[2]);
        assert_eq!(store.list_all(100).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let store = InMemoryDeliveryLogStore::new();
        let webhook_id = Uuid::new_v4();
        let now = Utc::now();
        store
            .append(&create_test_entry(webhook_id, now - Duration::days(40)))
            .await
            .unwrap();
        store
            .append(&create_test_entry(webhook_id, now))
            .await
            .unwrap();

        let removed = store
            .delete_older_than(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.list(webhook_id, 10).await.unwrap().len(), 1);
    }
}
