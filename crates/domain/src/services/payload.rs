//! Version-specific webhook payload rendering.
//!
//! Rendering is pure: the same event and version always serialize to the
//! same bytes, so a retry resends exactly what the first attempt sent and the
//! signature stays reproducible.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Event;

/// Wire schema versions understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    V1,
    V2,
}

impl PayloadVersion {
    /// Resolves a webhook's configured version. Unknown versions get the 1.0 shape.
    pub fn resolve(version: &str) -> Self {
        match version {
            "2.0" => PayloadVersion::V2,
            _ => PayloadVersion::V1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadVersion::V1 => "1.0",
            PayloadVersion::V2 => "2.0",
        }
    }
}

/// Formats an instant as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Version 1.0 body: `{id, type, timestamp, data}`.
#[derive(Debug, Serialize)]
pub struct PayloadV1<'a> {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub timestamp: String,
    pub data: &'a serde_json::Value,
}

/// Event header of a version 2.0 body.
#[derive(Debug, Serialize)]
pub struct EventEnvelopeV2<'a> {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub timestamp: String,
    pub version: &'static str,
}

/// Version 2.0 body: `{event: {id, type, timestamp, version}, data, metadata}`.
#[derive(Debug, Serialize)]
pub struct PayloadV2<'a> {
    pub event: EventEnvelopeV2<'a>,
    pub data: &'a serde_json::Value,
    pub metadata: &'a serde_json::Value,
}

/// A rendered payload, borrowed from its event.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookPayload<'a> {
    V1(PayloadV1<'a>),
    V2(PayloadV2<'a>),
}

/// Renders `event` in the shape expected by a webhook of the given `version`.
pub fn build_payload<'a>(event: &'a Event, version: &str) -> WebhookPayload<'a> {
    let timestamp = format_timestamp(event.timestamp);
    match PayloadVersion::resolve(version) {
        PayloadVersion::V1 => WebhookPayload::V1(PayloadV1 {
            id: event.id,
            event_type: &event.event_type,
            timestamp,
            data: &event.data,
        }),
        PayloadVersion::V2 => WebhookPayload::V2(PayloadV2 {
            event: EventEnvelopeV2 {
                id: event.id,
                event_type: &event.event_type,
                timestamp,
                version: PayloadVersion::V2.as_str(),
            },
            data: &event.data,
            metadata: &event.metadata,
        }),
    }
}

/// Renders and serializes the exact bytes that go on the wire.
pub fn serialize_payload(event: &Event, version: &str) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&build_payload(event, version))
}
