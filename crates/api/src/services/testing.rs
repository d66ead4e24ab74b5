//! Test doubles shared by the service unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::models::{DeliveryLogEntry, DeliveryOutcome, Event, Webhook};
use persistence::memory::InMemoryEventStore;
use persistence::{DeliveryLogStore, EventStore, StoreError, Stores};

use super::transport::{OutboundRequest, WebhookTransport};

/// Returns scripted outcomes in order, then repeats the fallback.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<DeliveryOutcome>>,
    fallback: DeliveryOutcome,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn always(outcome: DeliveryOutcome) -> Self {
        Self::scripted(Vec::new(), outcome)
    }

    pub fn scripted(script: Vec<DeliveryOutcome>, fallback: DeliveryOutcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for ScriptedTransport {
    async fn post(&self, request: OutboundRequest) -> DeliveryOutcome {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Stores an active webhook subscribed to `events` and a matching event.
pub async fn seed(stores: &Stores, events: &[&str]) -> (Webhook, Event) {
    let webhook = Webhook::new(
        Uuid::new_v4(),
        "https://partner.example.com/hooks".to_string(),
        "whsec_test".to_string(),
        events.iter().map(|e| e.to_string()).collect(),
        "1.0".to_string(),
        BTreeMap::new(),
    );
    stores.webhooks.insert(&webhook).await.unwrap();

    let event = Event::new(
        "booking.created",
        serde_json::json!({"booking_id": "bk_1"}),
        serde_json::json!({}),
    );
    stores.events.insert(&event).await.unwrap();

    (webhook, event)
}

/// Delivery log whose writes always fail.
pub struct BrokenDeliveryLog;

#[async_trait]
impl DeliveryLogStore for BrokenDeliveryLog {
    async fn append(&self, _entry: &DeliveryLogEntry) -> Result<(), StoreError> {
        Err(StoreError::Corrupt("delivery log unavailable".to_string()))
    }

    async fn list(
        &self,
        _webhook_id: Uuid,
        _limit: usize,
    ) -> Result<Vec<DeliveryLogEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_all(&self, _limit: usize) -> Result<Vec<DeliveryLogEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// In-memory event store whose reads can be switched off.
#[derive(Default)]
pub struct FlakyEventStore {
    inner: InMemoryEventStore,
    down: AtomicBool,
}

impl FlakyEventStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for FlakyEventStore {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.insert(event).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("event store unavailable".to_string()));
        }
        self.inner.get(id).await
    }
}
