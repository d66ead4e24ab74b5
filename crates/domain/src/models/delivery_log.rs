//! Per-attempt delivery history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::delivery::{Delivery, DeliveryOutcome};
use super::event::Event;

/// One delivery attempt, as recorded for the logs and stats views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryLogEntry {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub attempt: u32,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryLogEntry {
    pub fn from_attempt(
        delivery: &Delivery,
        event: &Event,
        outcome: &DeliveryOutcome,
        duration_ms: u64,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            webhook_id: delivery.webhook_id,
            delivery_id: delivery.id,
            event_id: event.id,
            event_type: event.event_type.clone(),
            attempt: delivery.attempt,
            success: outcome.is_success(),
            status_code: outcome.status_code(),
            error_message: outcome.reason().map(str::to_string),
            duration_ms,
            attempted_at,
        }
    }
}

/// Query parameters for list endpoints that accept a limit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Response for listing delivery log entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListDeliveryLogsResponse {
    pub webhook_id: Uuid,
    pub entries: Vec<DeliveryLogEntry>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_from_failed_attempt() {
        let event = Event::new("booking.created", serde_json::json!({}), serde_json::json!({}));
        let mut delivery = Delivery::new(Uuid::new_v4(), event.id, 5);
        delivery.attempt = 3;
        let outcome = DeliveryOutcome::from_status(502);
        let now = Utc::now();

        let entry = DeliveryLogEntry::from_attempt(&delivery, &event, &outcome, 120, now);
        assert_eq!(entry.webhook_id, delivery.webhook_id);
        assert_eq!(entry.delivery_id, delivery.id);
        assert_eq!(entry.event_type, "booking.created");
        assert_eq!(entry.attempt, 3);
        assert!(!entry.success);
        assert_eq!(entry.status_code, Some(502));
        assert_eq!(entry.error_message.as_deref(), Some("HTTP 502"));
        assert_eq!(entry.duration_ms, 120);
    }

    #[test]
    fn test_log_entry_from_success() {
        let event = Event::new("payment.succeeded", serde_json::json!({}), serde_json::json!({}));
        let delivery = Delivery::new(Uuid::new_v4(), event.id, 5);
        let outcome = DeliveryOutcome::Success { status_code: 204 };

        let entry = DeliveryLogEntry::from_attempt(&delivery, &event, &outcome, 5, Utc::now());
        assert!(entry.success);
        assert_eq!(entry.status_code, Some(204));
        assert!(entry.error_message.is_none());
    }
}
