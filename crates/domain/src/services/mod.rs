//! Domain services for the webhook delivery engine.
//!
//! Services contain business logic that operates on domain models.

pub mod payload;

pub use payload::{build_payload, format_timestamp, serialize_payload, PayloadVersion, WebhookPayload};
