//! Webhook delivery entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Delivery, DeliveryStatus};

use crate::store::StoreError;

/// Database row mapping for the webhook_deliveries table.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookDeliveryEntity {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_id: Uuid,
    pub attempt: i32,
    pub max_attempts: i32,
    pub status: String,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookDeliveryEntity> for Delivery {
    type Error = StoreError;

    fn try_from(entity: WebhookDeliveryEntity) -> Result<Self, Self::Error> {
        let status: DeliveryStatus = entity.status.parse().map_err(StoreError::Corrupt)?;
        Ok(Self {
            id: entity.id,
            webhook_id: entity.webhook_id,
            event_id: entity.event_id,
            attempt: entity.attempt.max(1) as u32,
            max_attempts: entity.max_attempts.max(1) as u32,
            status,
            next_retry_at: entity.next_retry_at,
            status_code: entity.status_code.and_then(|c| u16::try_from(c).ok()),
            error_message: entity.error_message,
            last_attempt_at: entity.last_attempt_at,
            completed_at: entity.completed_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entity(status: &str) -> WebhookDeliveryEntity {
        WebhookDeliveryEntity {
            id: Uuid::new_v4(),
            webhook_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            attempt: 3,
            max_attempts: 5,
            status: status.to_string(),
            next_retry_at: Some(Utc::now()),
            status_code: Some(503),
            error_message: Some("HTTP 503".to_string()),
            last_attempt_at: Some(Utc::now()),
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_delivery() {
        let delivery = Delivery::try_from(create_test_entity("scheduled_retry")).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::ScheduledRetry);
        assert_eq!(delivery.attempt, 3);
        assert_eq!(delivery.status_code, Some(503));
    }

    #[test]
    fn test_entity_with_unknown_status() {
        let result = Delivery::try_from(create_test_entity("exploded"));
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
