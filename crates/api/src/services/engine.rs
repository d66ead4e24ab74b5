//! The webhook engine facade.
//!
//! [`WebhookEngine`] wires the registry, delivery worker, retry scheduler and
//! dispatcher together over one set of stores. It is built once at startup
//! and shared by the HTTP layer and the background jobs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use domain::models::delivery::{DEFAULT_MAX_ATTEMPTS, TEST_MAX_ATTEMPTS};
use domain::models::webhook::{
    CreateWebhookRequest, RegisteredWebhook, UpdateWebhookRequest, WebhookResponse,
};
use domain::models::{DeadLetterEntry, Delivery, DeliveryLogEntry, EngineStats, Event, Webhook};
use persistence::Stores;
use shared::pagination::clamp_limit;

use super::delivery::DeliveryWorker;
use super::dispatcher::EventDispatcher;
use super::error::WebhookError;
use super::registry::WebhookRegistry;
use super::retry::RetryScheduler;
use super::transport::WebhookTransport;
use crate::config::DeliveryConfig;

/// Tunables of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_attempts: u32,
    pub worker_concurrency: usize,
    pub retry_batch_size: usize,
    pub require_https: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            worker_concurrency: 16,
            retry_batch_size: 100,
            require_https: true,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            worker_concurrency: config.worker_concurrency,
            retry_batch_size: config.retry_batch_size,
            require_https: config.require_https,
        }
    }
}

pub struct WebhookEngine {
    stores: Stores,
    registry: WebhookRegistry,
    worker: Arc<DeliveryWorker>,
    retry: RetryScheduler,
    dispatcher: EventDispatcher,
    settings: EngineSettings,
}

impl WebhookEngine {
    pub fn new(
        stores: Stores,
        transport: Arc<dyn WebhookTransport>,
        settings: EngineSettings,
    ) -> Self {
        let registry = WebhookRegistry::new(stores.webhooks.clone(), settings.require_https);
        let retry = RetryScheduler::new(stores.clone(), settings.retry_batch_size);
        let worker = Arc::new(DeliveryWorker::new(
            stores.clone(),
            transport,
            retry.clone(),
            settings.worker_concurrency,
        ));
        let dispatcher =
            EventDispatcher::new(stores.clone(), Arc::clone(&worker), settings.max_attempts);

        Self {
            stores,
            registry,
            worker,
            retry,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // Registry

    pub async fn register_webhook(
        &self,
        owner_id: Uuid,
        request: CreateWebhookRequest,
    ) -> Result<RegisteredWebhook, WebhookError> {
        self.registry.register(owner_id, request).await
    }

    /// Webhooks of one owner, without secrets.
    pub async fn list_webhooks(&self, owner_id: Uuid) -> Result<Vec<WebhookResponse>, WebhookError> {
        Ok(self
            .registry
            .list(owner_id)
            .await?
            .into_iter()
            .map(WebhookResponse::from)
            .collect())
    }

    pub async fn get_webhook(&self, id: Uuid) -> Result<Option<WebhookResponse>, WebhookError> {
        Ok(self.registry.get(id).await?.map(WebhookResponse::from))
    }

    pub async fn update_webhook(
        &self,
        id: Uuid,
        patch: UpdateWebhookRequest,
    ) -> Result<WebhookResponse, WebhookError> {
        Ok(self.registry.update(id, patch).await?.into())
    }

    pub async fn delete_webhook(&self, id: Uuid) -> Result<bool, WebhookError> {
        self.registry.delete(id).await
    }

    // Delivery

    /// Sends a synthetic `test_event` once and returns the resulting delivery.
    ///
    /// Test deliveries have a budget of one attempt, so they are never
    /// retried.
    pub async fn test_webhook(&self, id: Uuid) -> Result<Delivery, WebhookError> {
        let webhook = self.registry.require(id).await?;
        let event = Event::test_event(webhook.id);
        self.stores.events.insert(&event).await?;

        let delivery = Delivery::new(webhook.id, event.id, TEST_MAX_ATTEMPTS);
        self.stores.deliveries.insert(&delivery).await?;

        info!(webhook_id = %id, delivery_id = %delivery.id, "Sending test webhook");
        self.worker.send(&webhook, &event, delivery).await
    }

    /// Persists an event and fans it out. Deliveries run in the background.
    pub async fn trigger_event(
        &self,
        event_type: &str,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<Uuid, WebhookError> {
        self.dispatcher
            .trigger_event(event_type, data, metadata)
            .await
    }

    /// Fires due retries. Meant to be called on a fixed interval.
    pub async fn process_retries(&self) -> usize {
        self.retry.process_retries(&self.worker).await
    }

    pub async fn process_retries_at(&self, now: chrono::DateTime<Utc>) -> usize {
        self.retry.process_retries_at(&self.worker, now).await
    }

    /// Re-sends a dead-lettered event to the current version of its webhook.
    ///
    /// The entry itself is left untouched. The replay is a fresh delivery with
    /// the full attempt budget.
    pub async fn replay_dead_letter(&self, entry_id: Uuid) -> Result<Delivery, WebhookError> {
        let entry = self
            .stores
            .dead_letters
            .get(entry_id)
            .await?
            .ok_or_else(|| {
                WebhookError::NotFound(format!("Dead-letter entry {} not found", entry_id))
            })?;
        let webhook = self.registry.require(entry.webhook_id()).await?;

        let delivery = Delivery::new(webhook.id, entry.event.id, self.settings.max_attempts);
        self.stores.deliveries.insert(&delivery).await?;

        info!(
            dead_letter_id = %entry_id,
            webhook_id = %webhook.id,
            delivery_id = %delivery.id,
            original_delivery_id = %entry.delivery.id,
            "Replaying dead-lettered delivery"
        );
        self.worker.send(&webhook, &entry.event, delivery).await
    }

    pub async fn get_delivery(&self, id: Uuid) -> Result<Delivery, WebhookError> {
        self.stores
            .deliveries
            .get(id)
            .await?
            .ok_or_else(|| WebhookError::NotFound(format!("Delivery {} not found", id)))
    }

    /// Waits for background deliveries started by [`trigger_event`](Self::trigger_event).
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    // Queries

    /// Newest first.
    pub async fn get_delivery_logs(
        &self,
        webhook_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<DeliveryLogEntry>, WebhookError> {
        let limit = clamp_limit(limit) as usize;
        Ok(self.stores.delivery_logs.list(webhook_id, limit).await?)
    }

    /// Newest first, across all webhooks.
    pub async fn get_recent_delivery_logs(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<DeliveryLogEntry>, WebhookError> {
        let limit = clamp_limit(limit) as usize;
        Ok(self.stores.delivery_logs.list_all(limit).await?)
    }

    /// Newest first, optionally restricted to one webhook.
    pub async fn get_dead_letter_queue(
        &self,
        webhook_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<DeadLetterEntry>, WebhookError> {
        let limit = clamp_limit(limit) as usize;
        let entries = match webhook_id {
            Some(id) => self.stores.dead_letters.list(id, limit).await?,
            None => self.stores.dead_letters.list_all(limit).await?,
        };
        Ok(entries)
    }

    pub async fn get_stats(&self) -> Result<EngineStats, WebhookError> {
        let webhooks: Vec<Webhook> = self.registry.list_all().await?;
        let retry_queue_size = self.retry.pending_count().await?;
        let dead_letter_queue_size = self.stores.dead_letters.count().await?;
        Ok(EngineStats::from_webhooks(
            &webhooks,
            retry_queue_size,
            dead_letter_queue_size,
        ))
    }

    /// Deletes delivery log entries older than `retention_days`. 0 keeps everything.
    pub async fn cleanup_delivery_logs(&self, retention_days: u32) -> Result<u64, WebhookError> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let deleted = self.stores.delivery_logs.delete_older_than(cutoff).await?;
        if deleted > 0 {
            info!(deleted = deleted, cutoff = %cutoff, "Purged old webhook delivery logs");
        }
        Ok(deleted)
    }
}
