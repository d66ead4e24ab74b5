use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::webhook::UpdateWebhookRequest;
use domain::models::{StatCounter, Webhook, WebhookStats};

use crate::store::{StoreError, WebhookStore};

/// Counters live outside the record so increments only need a read lock.
#[derive(Default)]
struct Counters {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

impl Counters {
    fn from_stats(stats: &WebhookStats) -> Self {
        Self {
            total: AtomicU64::new(stats.total),
            successful: AtomicU64::new(stats.successful),
            failed: AtomicU64::new(stats.failed),
            retried: AtomicU64::new(stats.retried),
        }
    }

    fn counter(&self, counter: StatCounter) -> &AtomicU64 {
        match counter {
            StatCounter::Total => &self.total,
            StatCounter::Successful => &self.successful,
            StatCounter::Failed => &self.failed,
            StatCounter::Retried => &self.retried,
        }
    }

    fn snapshot(&self) -> WebhookStats {
        WebhookStats {
            total: self.total.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }
}

struct StoredWebhook {
    webhook: Webhook,
    counters: Counters,
}

impl StoredWebhook {
    fn load(&self) -> Webhook {
        let mut webhook = self.webhook.clone();
        webhook.stats = self.counters.snapshot();
        webhook
    }
}

#[derive(Default)]
pub struct InMemoryWebhookStore {
    webhooks: RwLock<HashMap<Uuid, StoredWebhook>>,
}

impl InMemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, predicate: F) -> Vec<Webhook>
    where
        F: Fn(&Webhook) -> bool,
    {
        let guard = self.webhooks.read().await;
        let mut webhooks: Vec<Webhook> = guard
            .values()
            .filter(|stored| predicate(&stored.webhook))
            .map(StoredWebhook::load)
            .collect();
        webhooks.sort_by_key(|w| w.created_at);
        webhooks
    }
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn insert(&self, webhook: &Webhook) -> Result<(), StoreError> {
        let stored = StoredWebhook {
            webhook: webhook.clone(),
            counters: Counters::from_stats(&webhook.stats),
        };
        self.webhooks.write().await.insert(webhook.id, stored);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Webhook>, StoreError> {
        Ok(self.webhooks.read().await.get(&id).map(StoredWebhook::load))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.collect(|w| w.owner_id == owner_id).await)
    }

    async fn list_all(&self) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.collect(|_| true).await)
    }

    async fn find_active_for_event(&self, event_type: &str) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.collect(|w| w.accepts(event_type)).await)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &UpdateWebhookRequest,
    ) -> Result<Option<Webhook>, StoreError> {
        let mut guard = self.webhooks.write().await;
        Ok(guard.get_mut(&id).map(|stored| {
            stored.webhook.apply_update(patch.clone());
            stored.load()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.webhooks.write().await.remove(&id).is_some())
    }

    async fn increment_stat(&self, id: Uuid, counter: StatCounter) -> Result<(), StoreError> {
        if let Some(stored) = self.webhooks.read().await.get(&id) {
            stored.counters.counter(counter).fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use domain::models::WILDCARD_EVENT;

    fn create_test_webhook(owner_id: Uuid, events: &[&str]) -> Webhook {
        Webhook::new(
            owner_id,
            "https://example.com/hook".to_string(),
            "whsec_test".to_string(),
            events.iter().map(|e| e.to_string()).collect(),
            "1.0".to_string(),
            BTreeMap::new(),
        )
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = InMemoryWebhookStore::new();
        let webhook = create_test_webhook(Uuid::new_v4(), &["*"]);
        store.insert(&webhook).await.unwrap();

        let found = store.get(webhook.id).await.unwrap().unwrap();
        assert_eq!(found.url, webhook.url);

        assert!(store.delete(webhook.id).await.unwrap());
        assert!(!store.delete(webhook.id).await.unwrap());
        assert!(store.get(webhook.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let store = InMemoryWebhookStore::new();
        let owner = Uuid::new_v4();
        store.insert(&create_test_webhook(owner, &["*"])).await.unwrap();
        store.insert(&create_test_webhook(owner, &["booking.created"])).await.unwrap();
        store
            .insert(&create_test_webhook(Uuid::new_v4(), &["*"]))
            .await
            .unwrap();

        assert_eq!(store.list_by_owner(owner).await.unwrap().len(), 2);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_find_active_for_event() {
        let store = InMemoryWebhookStore::new();
        let owner = Uuid::new_v4();
        let exact = create_test_webhook(owner, &["booking.created"]);
        let wildcard = create_test_webhook(owner, &[WILDCARD_EVENT]);
        let other = create_test_webhook(owner, &["payment.succeeded"]);
        let mut inactive = create_test_webhook(owner, &["*"]);
        inactive.active = false;
        for w in [&exact, &wildcard, &other, &inactive] {
            store.insert(w).await.unwrap();
        }

        let ids: Vec<Uuid> = store
            .find_active_for_event("booking.created")
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&exact.id));
        assert!(ids.contains(&wildcard.id));
    }

    #[tokio::test]
    async fn test_update_keeps_stats() {
        let store = InMemoryWebhookStore::new();
        let webhook = create_test_webhook(Uuid::new_v4(), &["*"]);
        store.insert(&webhook).await.unwrap();
        store
            .increment_stat(webhook.id, StatCounter::Total)
            .await
            .unwrap();

        let patch = UpdateWebhookRequest {
            active: Some(false),
            ..Default::default()
        };
        let updated = store.update(webhook.id, &patch).await.unwrap().unwrap();
        assert!(!updated.active);
        assert_eq!(updated.url, webhook.url);
        assert_eq!(updated.stats.total, 1);

        let found = store.get(webhook.id).await.unwrap().unwrap();
        assert!(!found.active);
        assert_eq!(found.stats.total, 1);
    }

    #[tokio::test]
    async fn test_update_missing_webhook() {
        let store = InMemoryWebhookStore::new();
        let patch = UpdateWebhookRequest {
            active: Some(false),
            ..Default::default()
        };
        assert!(store.update(Uuid::new_v4(), &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_fields_are_merged() {
        let store = Arc::new(InMemoryWebhookStore::new());
        let webhook = create_test_webhook(Uuid::new_v4(), &["booking.created"]);
        store.insert(&webhook).await.unwrap();

        let moved = "https://example.com/moved".to_string();
        let patches = [
            UpdateWebhookRequest {
                url: Some(moved.clone()),
                ..Default::default()
            },
            UpdateWebhookRequest {
                events: Some(vec![WILDCARD_EVENT.to_string()]),
                ..Default::default()
            },
            UpdateWebhookRequest {
                active: Some(false),
                ..Default::default()
            },
        ];
        let mut handles = Vec::new();
        for patch in patches {
            let store = store.clone();
            let id = webhook.id;
            handles.push(tokio::spawn(async move {
                store.update(id, &patch).await.unwrap().unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let found = store.get(webhook.id).await.unwrap().unwrap();
        assert_eq!(found.url, moved);
        assert_eq!(found.events, vec![WILDCARD_EVENT.to_string()]);
        assert!(!found.active);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryWebhookStore::new());
        let webhook = create_test_webhook(Uuid::new_v4(), &["*"]);
        store.insert(&webhook).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = webhook.id;
            handles.push(tokio::spawn(async move {
                store.increment_stat(id, StatCounter::Total).await.unwrap();
                store.increment_stat(id, StatCounter::Failed).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = store.get(webhook.id).await.unwrap().unwrap().stats;
        assert_eq!(stats.total, 50);
        assert_eq!(stats.failed, 50);
        assert_eq!(stats.successful, 0);
    }

    #[tokio::test]
    async fn test_increment_unknown_webhook_is_noop() {
        let store = InMemoryWebhookStore::new();
        assert!(store
            .increment_stat(Uuid::new_v4(), StatCounter::Total)
            .await
            .is_ok());
    }
}
