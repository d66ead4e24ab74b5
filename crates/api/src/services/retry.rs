//! Retry scheduling and dead-lettering.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use domain::models::{
    backoff_delay, DeadLetterEntry, Delivery, DeliveryStatus, Event, StatCounter, Webhook,
};
use persistence::Stores;

use super::delivery::DeliveryWorker;
use super::error::WebhookError;
use crate::middleware::metrics::{record_dead_letter, record_retry_scheduled};

/// Decides what happens after a failed attempt and fires due retries.
#[derive(Clone)]
pub struct RetryScheduler {
    stores: Stores,
    batch_size: usize,
}

impl RetryScheduler {
    /// `batch_size` bounds how many due retries one scan claims.
    pub fn new(stores: Stores, batch_size: usize) -> Self {
        Self {
            stores,
            batch_size: batch_size.max(1),
        }
    }

    /// Handles a failed attempt of `delivery` against `webhook`.
    ///
    /// With attempts left the delivery is rescheduled with exponential
    /// backoff, unless the webhook has since been disabled or deleted, in
    /// which case it ends as `failed`. With the budget spent it is
    /// dead-lettered.
    pub async fn handle_failure(
        &self,
        webhook: &Webhook,
        event: &Event,
        mut delivery: Delivery,
    ) -> Result<Delivery, WebhookError> {
        let now = Utc::now();

        if !delivery.has_attempts_remaining() {
            return self.dead_letter(webhook, event, delivery, now).await;
        }

        match self.stores.webhooks.get(webhook.id).await? {
            None => {
                delivery.mark_failed("webhook deleted", now);
                self.stores.deliveries.update(&delivery).await?;
                info!(
                    webhook_id = %webhook.id,
                    delivery_id = %delivery.id,
                    "Webhook deleted during delivery, not retrying"
                );
                Ok(delivery)
            }
            Some(current) if !current.active => {
                delivery.mark_failed("webhook disabled", now);
                self.stores.deliveries.update(&delivery).await?;
                info!(
                    webhook_id = %webhook.id,
                    delivery_id = %delivery.id,
                    "Webhook disabled during delivery, not retrying"
                );
                Ok(delivery)
            }
            Some(_) => match delivery.schedule_retry(now) {
                Some(next_retry_at) => {
                    self.stores.deliveries.schedule_retry(&delivery).await?;
                    self.stores
                        .webhooks
                        .increment_stat(webhook.id, StatCounter::Retried)
                        .await?;
                    record_retry_scheduled();
                    info!(
                        webhook_id = %webhook.id,
                        delivery_id = %delivery.id,
                        attempt = delivery.attempt,
                        next_retry_at = %next_retry_at,
                        "Webhook delivery retry scheduled"
                    );
                    Ok(delivery)
                }
                None => self.dead_letter(webhook, event, delivery, now).await,
            },
        }
    }

    async fn dead_letter(
        &self,
        webhook: &Webhook,
        event: &Event,
        mut delivery: Delivery,
        now: DateTime<Utc>,
    ) -> Result<Delivery, WebhookError> {
        delivery.mark_dead_lettered(now);
        self.stores.deliveries.update(&delivery).await?;
        self.stores.deliveries.remove_pending(delivery.id).await?;

        let entry = DeadLetterEntry::new(webhook, event, &delivery, now);
        self.stores.dead_letters.append(&entry).await?;
        record_dead_letter();

        warn!(
            webhook_id = %webhook.id,
            event_id = %event.id,
            delivery_id = %delivery.id,
            dead_letter_id = %entry.id,
            attempts = delivery.attempt,
            last_error = ?delivery.error_message,
            "Webhook delivery moved to dead-letter queue"
        );
        Ok(delivery)
    }

    /// Fires every retry that is due now. Returns the number of attempts made.
    pub async fn process_retries(&self, worker: &Arc<DeliveryWorker>) -> usize {
        self.process_retries_at(worker, Utc::now()).await
    }

    /// Fires every retry due at or before `now` and waits for the attempts
    /// to resolve. Returns the number of attempts made.
    ///
    /// The current webhook is looked up again for each retry so that updates
    /// made since the failed attempt (url, active flag) are honoured. A
    /// claimed retry that cannot be prepared or whose attempt errors out is
    /// put back in the pending set.
    pub async fn process_retries_at(
        &self,
        worker: &Arc<DeliveryWorker>,
        now: DateTime<Utc>,
    ) -> usize {
        let claimed = match self
            .stores
            .deliveries
            .claim_due_retries(now, self.batch_size)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                error!(error = %e, "Failed to claim due webhook retries");
                return 0;
            }
        };

        if claimed.is_empty() {
            return 0;
        }
        debug!(count = claimed.len(), "Claimed due webhook retries");

        let mut tasks = JoinSet::new();
        for delivery in claimed {
            match self.resolve(delivery.clone(), now).await {
                Ok(Some((webhook, event, ready))) => {
                    let worker = Arc::clone(worker);
                    tasks.spawn(async move {
                        let result = worker.send(&webhook, &event, ready).await;
                        (delivery, result)
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    error!(delivery_id = %delivery.id, error = %e, "Failed to prepare webhook retry");
                    self.requeue(delivery, now).await;
                }
            }
        }

        let mut fired = 0;
        while let Some(joined) = tasks.join_next().await {
            fired += 1;
            match joined {
                Ok((_, Ok(delivery))) => debug!(
                    delivery_id = %delivery.id,
                    status = %delivery.status,
                    "Webhook retry resolved"
                ),
                Ok((claimed, Err(e))) => {
                    error!(delivery_id = %claimed.id, error = %e, "Webhook retry failed");
                    self.requeue(claimed, now).await;
                }
                Err(e) => error!(error = %e, "Webhook retry task panicked"),
            }
        }

        info!(fired = fired, "Processed webhook retries");
        fired
    }

    /// Returns a claimed retry to the pending set at its current attempt,
    /// unless the attempt already moved it on.
    async fn requeue(&self, mut delivery: Delivery, now: DateTime<Utc>) {
        if let Ok(Some(current)) = self.stores.deliveries.get(delivery.id).await {
            if current.status != DeliveryStatus::Pending {
                return;
            }
        }

        let due = now + backoff_delay(delivery.attempt);
        delivery.requeue(due, Utc::now());
        match self.stores.deliveries.schedule_retry(&delivery).await {
            Ok(()) => warn!(
                delivery_id = %delivery.id,
                attempt = delivery.attempt,
                next_retry_at = %due,
                "Webhook retry put back in queue"
            ),
            Err(e) => error!(
                delivery_id = %delivery.id,
                error = %e,
                "Failed to put webhook retry back in queue"
            ),
        }
    }

    /// Loads what a claimed retry needs. Retries whose webhook is gone or
    /// disabled, or whose event is gone, end as `failed` and yield `None`.
    async fn resolve(
        &self,
        mut delivery: Delivery,
        now: DateTime<Utc>,
    ) -> Result<Option<(Webhook, Event, Delivery)>, WebhookError> {
        let Some(webhook) = self.stores.webhooks.get(delivery.webhook_id).await? else {
            delivery.mark_failed("webhook deleted", now);
            self.stores.deliveries.update(&delivery).await?;
            warn!(
                webhook_id = %delivery.webhook_id,
                delivery_id = %delivery.id,
                "Dropping retry for deleted webhook"
            );
            return Ok(None);
        };

        if !webhook.active {
            delivery.mark_failed("webhook disabled", now);
            self.stores.deliveries.update(&delivery).await?;
            info!(
                webhook_id = %webhook.id,
                delivery_id = %delivery.id,
                "Dropping retry for disabled webhook"
            );
            return Ok(None);
        }

        let Some(event) = self.stores.events.get(delivery.event_id).await? else {
            delivery.mark_failed("event not found", now);
            self.stores.deliveries.update(&delivery).await?;
            error!(
                event_id = %delivery.event_id,
                delivery_id = %delivery.id,
                "Dropping retry for unknown event"
            );
            return Ok(None);
        };

        Ok(Some((webhook, event, delivery)))
    }

    pub async fn pending_count(&self) -> Result<usize, WebhookError> {
        Ok(self.stores.deliveries.pending_retry_count().await?)
    }
}
