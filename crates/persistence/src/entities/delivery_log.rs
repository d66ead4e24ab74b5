//! Delivery log entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::DeliveryLogEntry;

/// Database row mapping for the webhook_delivery_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryLogEntity {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub attempt: i32,
    pub success: bool,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub attempted_at: DateTime<Utc>,
}

impl From<DeliveryLogEntity> for DeliveryLogEntry {
    fn from(entity: DeliveryLogEntity) -> Self {
        Self {
            id: entity.id,
            webhook_id: entity.webhook_id,
            delivery_id: entity.delivery_id,
            event_id: entity.event_id,
            event_type: entity.event_type,
            attempt: entity.attempt.max(1) as u32,
            success: entity.success,
            status_code: entity.status_code.and_then(|c| u16::try_from(c).ok()),
            error_message: entity.error_message,
            duration_ms: entity.duration_ms.max(0) as u64,
            attempted_at: entity.attempted_at,
        }
    }
}
