//! Storage contracts for the webhook engine.
//!
//! Every record type the engine keeps has a trait here. The engine only talks
//! to these traits, so the in-memory and PostgreSQL backends are
//! interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use domain::models::webhook::UpdateWebhookRequest;
use domain::models::{DeadLetterEntry, Delivery, DeliveryLogEntry, Event, StatCounter, Webhook};

use crate::memory::{
    InMemoryDeadLetterStore, InMemoryDeliveryLogStore, InMemoryDeliveryStore, InMemoryEventStore,
    InMemoryWebhookStore,
};
use crate::repositories::{
    DeadLetterRepository, DeliveryLogRepository, WebhookDeliveryRepository,
    WebhookEventRepository, WebhookRepository,
};

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Webhook registrations.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn insert(&self, webhook: &Webhook) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Webhook>, StoreError>;

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Webhook>, StoreError>;

    /// Active webhooks subscribed to `event_type` directly or through `*`.
    async fn find_active_for_event(&self, event_type: &str) -> Result<Vec<Webhook>, StoreError>;

    /// Merges the fields set in `patch` into the stored registration in one
    /// step, so concurrent patches to different fields are all kept.
    /// Statistics are left alone.
    ///
    /// Returns the updated webhook, or `None` when it no longer exists.
    async fn update(
        &self,
        id: Uuid,
        patch: &UpdateWebhookRequest,
    ) -> Result<Option<Webhook>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Atomically bumps one counter. A no-op for unknown webhooks.
    async fn increment_stat(&self, id: Uuid, counter: StatCounter) -> Result<(), StoreError>;
}

/// Events accepted for delivery.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError>;
}

/// Delivery records and the pending-retry set.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError>;

    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    /// Persists a delivery in `scheduled_retry` and makes it claimable at
    /// its `next_retry_at`.
    async fn schedule_retry(&self, delivery: &Delivery) -> Result<(), StoreError>;

    /// Removes up to `limit` retries due at or before `now` from the pending
    /// set and returns them, oldest due time first.
    ///
    /// Claimed deliveries are moved back to `pending` and are never handed
    /// out twice.
    async fn claim_due_retries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Delivery>, StoreError>;

    /// Drops a delivery from the pending set if it is there.
    ///
    /// A delivery still in `scheduled_retry` ends as `failed`. Deliveries in
    /// any other status are left as they are.
    async fn remove_pending(&self, id: Uuid) -> Result<(), StoreError>;

    async fn pending_retry_count(&self) -> Result<usize, StoreError>;
}

/// Quarantined deliveries.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    async fn append(&self, entry: &DeadLetterEntry) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEntry>, StoreError>;

    /// Newest first.
    async fn list(&self, webhook_id: Uuid, limit: usize)
        -> Result<Vec<DeadLetterEntry>, StoreError>;

    /// Newest first.
    async fn list_all(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// Append-only record of delivery attempts.
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    async fn append(&self, entry: &DeliveryLogEntry) -> Result<(), StoreError>;

    /// Newest first.
    async fn list(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DeliveryLogEntry>, StoreError>;

    /// Newest first.
    async fn list_all(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>, StoreError>;

    /// Deletes entries attempted before `cutoff`. Returns the number removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// The full set of stores the engine is wired with.
#[derive(Clone)]
pub struct Stores {
    pub webhooks: Arc<dyn WebhookStore>,
    pub events: Arc<dyn EventStore>,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub dead_letters: Arc<dyn DeadLetterStore>,
    pub delivery_logs: Arc<dyn DeliveryLogStore>,
}

impl Stores {
    /// Process-local stores. State is lost on restart.
    pub fn in_memory() -> Self {
        Self {
            webhooks: Arc::new(InMemoryWebhookStore::new()),
            events: Arc::new(InMemoryEventStore::new()),
            deliveries: Arc::new(InMemoryDeliveryStore::new()),
            dead_letters: Arc::new(InMemoryDeadLetterStore::new()),
            delivery_logs: Arc::new(InMemoryDeliveryLogStore::new()),
        }
    }

    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            webhooks: Arc::new(WebhookRepository::new(pool.clone())),
            events: Arc::new(WebhookEventRepository::new(pool.clone())),
            deliveries: Arc::new(WebhookDeliveryRepository::new(pool.clone())),
            dead_letters: Arc::new(DeadLetterRepository::new(pool.clone())),
            delivery_logs: Arc::new(DeliveryLogRepository::new(pool)),
        }
    }
}
