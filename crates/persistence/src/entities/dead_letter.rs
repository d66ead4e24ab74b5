//! Dead-letter entity (database row mapping).
//!
//! The webhook snapshot, event and delivery are stored as JSONB so that the
//! entry stays readable after the webhook is deleted.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::DeadLetterEntry;

use crate::store::StoreError;

/// Database row mapping for the webhook_dead_letters table.
#[derive(Debug, Clone, FromRow)]
pub struct DeadLetterEntity {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub webhook_snapshot: serde_json::Value,
    pub event: serde_json::Value,
    pub delivery: serde_json::Value,
    pub quarantined_at: DateTime<Utc>,
}

impl TryFrom<DeadLetterEntity> for DeadLetterEntry {
    type Error = StoreError;

    fn try_from(entity: DeadLetterEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            webhook: serde_json::from_value(entity.webhook_snapshot)?,
            event: serde_json::from_value(entity.event)?,
            delivery: serde_json::from_value(entity.delivery)?,
            quarantined_at: entity.quarantined_at,
        })
    }
}
