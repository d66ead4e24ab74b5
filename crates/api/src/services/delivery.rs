//! Single delivery attempts.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use domain::models::{Delivery, DeliveryLogEntry, DeliveryOutcome, Event, StatCounter, Webhook};
use domain::services::{format_timestamp, serialize_payload};
use persistence::Stores;
use shared::crypto::{sign_payload, signature_header};

use super::error::WebhookError;
use super::retry::RetryScheduler;
use super::transport::{OutboundRequest, WebhookTransport};
use crate::middleware::metrics::record_delivery_attempt;

pub const HEADER_WEBHOOK_ID: &str = "x-webhook-id";
pub const HEADER_EVENT_ID: &str = "x-event-id";
pub const HEADER_DELIVERY_ID: &str = "x-delivery-id";
pub const HEADER_WEBHOOK_VERSION: &str = "x-webhook-version";
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_SIGNATURE: &str = "x-signature";

/// Performs delivery attempts and records their outcome.
///
/// At most `concurrency` outbound requests are in flight at once.
pub struct DeliveryWorker {
    stores: Stores,
    transport: Arc<dyn WebhookTransport>,
    retry: RetryScheduler,
    permits: Arc<Semaphore>,
}

impl DeliveryWorker {
    pub fn new(
        stores: Stores,
        transport: Arc<dyn WebhookTransport>,
        retry: RetryScheduler,
        concurrency: usize,
    ) -> Self {
        Self {
            stores,
            transport,
            retry,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Runs the current attempt of `delivery` and returns its resulting state.
    ///
    /// Failed attempts are handed to the [`RetryScheduler`] before returning,
    /// so the next attempt for this delivery can only start after this one
    /// has fully resolved.
    pub async fn send(
        &self,
        webhook: &Webhook,
        event: &Event,
        mut delivery: Delivery,
    ) -> Result<Delivery, WebhookError> {
        if !webhook.active {
            delivery.mark_failed("webhook disabled", Utc::now());
            self.stores.deliveries.update(&delivery).await?;
            info!(
                webhook_id = %webhook.id,
                delivery_id = %delivery.id,
                "Skipping delivery to disabled webhook"
            );
            return Ok(delivery);
        }

        let attempted_at = Utc::now();
        let started = Instant::now();
        let outcome = match build_request(webhook, event, &delivery, attempted_at) {
            Ok(request) => {
                let _permit = self.permits.acquire().await.ok();
                self.transport.post(request).await
            }
            Err(reason) => DeliveryOutcome::PermanentFailure { reason },
        };
        let elapsed = started.elapsed();

        delivery.record_attempt(
            outcome.status_code(),
            outcome.reason().map(str::to_string),
            attempted_at,
        );
        // Bookkeeping failures must not keep the delivery from its next state
        if let Err(e) = self.record_stats(webhook, &outcome).await {
            error!(
                webhook_id = %webhook.id,
                delivery_id = %delivery.id,
                error = %e,
                "Failed to record webhook statistics"
            );
        }
        let entry = DeliveryLogEntry::from_attempt(
            &delivery,
            event,
            &outcome,
            elapsed.as_millis() as u64,
            attempted_at,
        );
        if let Err(e) = self.stores.delivery_logs.append(&entry).await {
            error!(
                webhook_id = %webhook.id,
                delivery_id = %delivery.id,
                error = %e,
                "Failed to append delivery log entry"
            );
        }
        record_delivery_attempt(outcome.label(), elapsed.as_secs_f64());

        match outcome {
            DeliveryOutcome::Success { status_code } => {
                delivery.mark_success(Utc::now());
                self.stores.deliveries.update(&delivery).await?;
                info!(
                    webhook_id = %webhook.id,
                    event_id = %event.id,
                    delivery_id = %delivery.id,
                    attempt = delivery.attempt,
                    status_code = status_code,
                    duration_ms = elapsed.as_millis() as u64,
                    "Webhook delivered successfully"
                );
                Ok(delivery)
            }
            DeliveryOutcome::TransientFailure {
                status_code,
                reason,
            } => {
                warn!(
                    webhook_id = %webhook.id,
                    event_id = %event.id,
                    delivery_id = %delivery.id,
                    attempt = delivery.attempt,
                    max_attempts = delivery.max_attempts,
                    status_code = ?status_code,
                    reason = %reason,
                    "Webhook delivery attempt failed"
                );
                self.retry.handle_failure(webhook, event, delivery).await
            }
            DeliveryOutcome::PermanentFailure { reason } => {
                delivery.mark_failed(reason.clone(), Utc::now());
                self.stores.deliveries.update(&delivery).await?;
                warn!(
                    webhook_id = %webhook.id,
                    delivery_id = %delivery.id,
                    reason = %reason,
                    "Webhook delivery cannot be attempted, not retrying"
                );
                Ok(delivery)
            }
        }
    }

    /// `total` only counts requests that were actually issued.
    async fn record_stats(
        &self,
        webhook: &Webhook,
        outcome: &DeliveryOutcome,
    ) -> Result<(), WebhookError> {
        let webhooks = &self.stores.webhooks;
        match outcome {
            DeliveryOutcome::Success { .. } => {
                webhooks.increment_stat(webhook.id, StatCounter::Total).await?;
                webhooks
                    .increment_stat(webhook.id, StatCounter::Successful)
                    .await?;
            }
            DeliveryOutcome::TransientFailure { .. } => {
                webhooks.increment_stat(webhook.id, StatCounter::Total).await?;
                webhooks.increment_stat(webhook.id, StatCounter::Failed).await?;
            }
            DeliveryOutcome::PermanentFailure { .. } => {
                webhooks.increment_stat(webhook.id, StatCounter::Failed).await?;
            }
        }
        Ok(())
    }
}

/// Renders, signs and addresses one attempt.
///
/// Webhook-declared headers go in first so that the delivery headers always
/// win.
fn build_request(
    webhook: &Webhook,
    event: &Event,
    delivery: &Delivery,
    sent_at: chrono::DateTime<Utc>,
) -> Result<OutboundRequest, String> {
    let body = serialize_payload(event, &webhook.version)
        .map_err(|e| format!("Failed to serialize payload: {}", e))?;
    let signature =
        sign_payload(&webhook.secret, &body).map_err(|e| format!("Failed to sign payload: {}", e))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &webhook.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(webhook_id = %webhook.id, header = %name, "Skipping invalid custom header"),
        }
    }

    let delivery_headers = [
        (HEADER_WEBHOOK_ID, webhook.id.to_string()),
        (HEADER_EVENT_ID, event.id.to_string()),
        (HEADER_DELIVERY_ID, delivery.id.to_string()),
        (HEADER_WEBHOOK_VERSION, webhook.version.clone()),
        (HEADER_TIMESTAMP, format_timestamp(sent_at)),
        (HEADER_SIGNATURE, signature_header(&signature)),
    ];
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in delivery_headers {
        let value = HeaderValue::from_str(&value)
            .map_err(|_| format!("Invalid value for header {}", name))?;
        headers.insert(HeaderName::from_static(name), value);
    }

    Ok(OutboundRequest {
        url: webhook.url.clone(),
        headers,
        body,
    })
}
