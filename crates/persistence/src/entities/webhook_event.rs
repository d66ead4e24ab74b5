//! Webhook event entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Event;

/// Database row mapping for the webhook_events table.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEventEntity {
    pub id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl From<WebhookEventEntity> for Event {
    fn from(entity: WebhookEventEntity) -> Self {
        Self {
            id: entity.id,
            event_type: entity.event_type,
            data: entity.data,
            metadata: entity.metadata,
            timestamp: entity.occurred_at,
        }
    }
}
