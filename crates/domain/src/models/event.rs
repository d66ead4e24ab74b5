//! Domain event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type used for synthetic test deliveries.
pub const TEST_EVENT_TYPE: &str = "test_event";

/// An immutable fact produced by the booking/payment/auth domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates a new event stamped with the current instant.
    pub fn new(
        event_type: impl Into<String>,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            data,
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// Synthetic event sent by the "test webhook" operation.
    pub fn test_event(webhook_id: Uuid) -> Self {
        Self::new(
            TEST_EVENT_TYPE,
            serde_json::json!({
                "message": "This is a test webhook delivery",
                "webhook_id": webhook_id,
            }),
            serde_json::json!({ "test": true }),
        )
    }
}

/// Request payload for triggering an event.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEventRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Response for a triggered event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TriggerEventResponse {
    pub event_id: Uuid,
}
