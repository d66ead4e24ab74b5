//! Event fan-out.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{error, info};
use uuid::Uuid;

use domain::models::{Delivery, Event};
use persistence::Stores;
use shared::validation::MAX_EVENT_TYPE_LENGTH;

use super::delivery::DeliveryWorker;
use super::error::WebhookError;

/// Matches events to subscribers and starts their first delivery attempt.
pub struct EventDispatcher {
    stores: Stores,
    worker: Arc<DeliveryWorker>,
    tracker: TaskTracker,
    max_attempts: u32,
}

impl EventDispatcher {
    pub fn new(stores: Stores, worker: Arc<DeliveryWorker>, max_attempts: u32) -> Self {
        Self {
            stores,
            worker,
            tracker: TaskTracker::new(),
            max_attempts,
        }
    }

    /// Persists an event and creates one delivery per matching active webhook.
    ///
    /// Returns as soon as the deliveries are recorded. The attempts run in
    /// the background and their outcome is never reported to the caller.
    pub async fn trigger_event(
        &self,
        event_type: &str,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<Uuid, WebhookError> {
        validate_event_type(event_type)?;

        let event = Arc::new(Event::new(event_type, data, metadata));
        self.stores.events.insert(&event).await?;

        let webhooks = self
            .stores
            .webhooks
            .find_active_for_event(&event.event_type)
            .await?;

        for webhook in &webhooks {
            let delivery = Delivery::new(webhook.id, event.id, self.max_attempts);
            self.stores.deliveries.insert(&delivery).await?;

            let worker = Arc::clone(&self.worker);
            let event = Arc::clone(&event);
            let webhook = webhook.clone();
            self.tracker.spawn(async move {
                let delivery_id = delivery.id;
                if let Err(e) = worker.send(&webhook, &event, delivery).await {
                    error!(
                        webhook_id = %webhook.id,
                        delivery_id = %delivery_id,
                        error = %e,
                        "Webhook delivery failed unexpectedly"
                    );
                }
            });
        }

        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            matched_webhooks = webhooks.len(),
            "Event dispatched"
        );

        Ok(event.id)
    }

    /// Waits for every delivery started so far to resolve.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

fn validate_event_type(event_type: &str) -> Result<(), WebhookError> {
    if event_type.trim().is_empty() {
        return Err(WebhookError::Validation(
            "type: Event type is required".to_string(),
        ));
    }
    if event_type.len() > MAX_EVENT_TYPE_LENGTH {
        return Err(WebhookError::Validation(format!(
            "type: Event type must be at most {} characters",
            MAX_EVENT_TYPE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use domain::models::DeliveryOutcome;

    use crate::services::retry::RetryScheduler;
    use crate::services::testing::{seed, ScriptedTransport};

    fn dispatcher(stores: &Stores, transport: Arc<ScriptedTransport>) -> EventDispatcher {
        let retry = RetryScheduler::new(stores.clone(), 100);
        let worker = Arc::new(DeliveryWorker::new(stores.clone(), transport, retry, 4));
        EventDispatcher::new(stores.clone(), worker, 5)
    }

    #[tokio::test]
    async fn test_trigger_event_fans_out_to_matching_webhooks() {
        let stores = Stores::in_memory();
        let transport = Arc::new(ScriptedTransport::always(DeliveryOutcome::Success {
            status_code: 200,
        }));
        let (exact, _) = seed(&stores, &["booking.created"]).await;
        let (wildcard, _) = seed(&stores, &["*"]).await;
        let (other, _) = seed(&stores, &["payment.succeeded"]).await;
        let dispatcher = dispatcher(&stores, transport.clone());

        let event_id = dispatcher
            .trigger_event("booking.created", serde_json::json!({"id": 7}), serde_json::json!({}))
            .await
            .unwrap();
        dispatcher.drain().await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let targets: HashSet<String> = requests
            .iter()
            .map(|r| r.headers["x-webhook-id"].to_str().unwrap().to_string())
            .collect();
        assert!(targets.contains(&exact.id.to_string()));
        assert!(targets.contains(&wildcard.id.to_string()));
        assert!(!targets.contains(&other.id.to_string()));
        for request in &requests {
            assert_eq!(request.headers["x-event-id"], event_id.to_string().as_str());
        }

        assert!(stores.events.get(event_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_trigger_event_without_subscribers() {
        let stores = Stores::in_memory();
        let transport = Arc::new(ScriptedTransport::always(DeliveryOutcome::Success {
            status_code: 200,
        }));
        let dispatcher = dispatcher(&stores, transport.clone());

        let event_id = dispatcher
            .trigger_event("auth.login", serde_json::Value::Null, serde_json::Value::Null)
            .await
            .unwrap();
        dispatcher.drain().await;

        assert_eq!(transport.request_count(), 0);
        assert!(stores.events.get(event_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_trigger_event_rejects_blank_type() {
        let stores = Stores::in_memory();
        let dispatcher = dispatcher(
            &stores,
            Arc::new(ScriptedTransport::always(DeliveryOutcome::Success {
                status_code: 200,
            })),
        );

        let result = dispatcher
            .trigger_event("  ", serde_json::Value::Null, serde_json::Value::Null)
            .await;
        assert!(matches!(result, Err(WebhookError::Validation(_))));
    }

    #[tokio::test]
    async fn test_trigger_event_type_length_limit() {
        let stores = Stores::in_memory();
        let transport = Arc::new(ScriptedTransport::always(DeliveryOutcome::Success {
            status_code: 200,
        }));
        let dispatcher = dispatcher(&stores, transport);

        let too_long = "a".repeat(MAX_EVENT_TYPE_LENGTH + 1);
        let result = dispatcher
            .trigger_event(&too_long, serde_json::Value::Null, serde_json::Value::Null)
            .await;
        assert!(matches!(result, Err(WebhookError::Validation(_))));

        let longest = "a".repeat(MAX_EVENT_TYPE_LENGTH);
        assert!(dispatcher
            .trigger_event(&longest, serde_json::Value::Null, serde_json::Value::Null)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_drain_allows_further_dispatch() {
        let stores = Stores::in_memory();
        let transport = Arc::new(ScriptedTransport::always(DeliveryOutcome::Success {
            status_code: 200,
        }));
        seed(&stores, &["*"]).await;
        let dispatcher = dispatcher(&stores, transport.clone());

        for _ in 0..2 {
            dispatcher
                .trigger_event("booking.created", serde_json::Value::Null, serde_json::Value::Null)
                .await
                .unwrap();
            dispatcher.drain().await;
        }

        assert_eq!(transport.request_count(), 2);
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
