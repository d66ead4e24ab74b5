use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use domain::models::{Delivery, DeliveryStatus};

use crate::store::{DeliveryStore, StoreError};

#[derive(Default)]
struct Inner {
    deliveries: HashMap<Uuid, Delivery>,
    /// Min-heap of (due, id). Entries whose due time no longer matches
    /// `pending` are stale and skipped when popped.
    queue: BinaryHeap<Reverse<(DateTime<Utc>, Uuid)>>,
    pending: HashMap<Uuid, DateTime<Utc>>,
}

#[derive(Default)]
pub struct InMemoryDeliveryStore {
    inner: Mutex<Inner>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.deliveries.insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if delivery.status != DeliveryStatus::ScheduledRetry {
            inner.pending.remove(&delivery.id);
        }
        inner.deliveries.insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.inner.lock().await.deliveries.get(&id).cloned())
    }

    async fn schedule_retry(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let due = delivery.next_retry_at.ok_or_else(|| {
            StoreError::Corrupt(format!("delivery {} has no retry time", delivery.id))
        })?;

        let mut inner = self.inner.lock().await;
        inner.deliveries.insert(delivery.id, delivery.clone());
        inner.pending.insert(delivery.id, due);
        inner.queue.push(Reverse((due, delivery.id)));
        Ok(())
    }

    async fn claim_due_retries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Delivery>, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut claimed = Vec::new();

        while claimed.len() < limit {
            let Some(Reverse((due, id))) = inner.queue.peek().copied() else {
                break;
            };
            if due > now {
                break;
            }
            inner.queue.pop();

            if inner.pending.get(&id) != Some(&due) {
                continue;
            }
            inner.pending.remove(&id);
            if let Some(delivery) = inner.deliveries.get_mut(&id) {
                delivery.mark_pending(now);
                claimed.push(delivery.clone());
            }
        }

        Ok(claimed)
    }

    async fn remove_pending(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.pending.remove(&id);
        if let Some(delivery) = inner.deliveries.get_mut(&id) {
            if delivery.status == DeliveryStatus::ScheduledRetry {
                let now = Utc::now();
                delivery.status = DeliveryStatus::Failed;
                delivery.next_retry_at = None;
                delivery.completed_at = Some(now);
                delivery.updated_at = now;
            }
        }
        Ok(())
    }

    async fn pending_retry_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().await.pending.len())
    }
}
