//! Dead-letter queue entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::delivery::Delivery;
use super::event::Event;
use super::webhook::{Webhook, WebhookSnapshot};

/// A delivery that exhausted its attempt budget.
///
/// Entries are append-only and never mutated once stored. They reference the
/// webhook by id inside the snapshot, so deleting the webhook leaves them intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub webhook: WebhookSnapshot,
    pub event: Event,
    pub delivery: Delivery,
    pub quarantined_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    pub fn new(webhook: &Webhook, event: &Event, delivery: &Delivery, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            webhook: WebhookSnapshot::from(webhook),
            event: event.clone(),
            delivery: delivery.clone(),
            quarantined_at: at,
        }
    }

    pub fn webhook_id(&self) -> Uuid {
        self.webhook.id
    }
}

/// Response for listing dead-letter entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListDeadLettersResponse {
    pub entries: Vec<DeadLetterEntry>,
    pub total: i64,
}
