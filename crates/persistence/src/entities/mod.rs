//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod dead_letter;
pub mod delivery_log;
pub mod webhook;
pub mod webhook_delivery;
pub mod webhook_event;

pub use dead_letter::DeadLetterEntity;
pub use delivery_log::DeliveryLogEntity;
pub use webhook::WebhookEntity;
pub use webhook_delivery::WebhookDeliveryEntity;
pub use webhook_event::WebhookEventEntity;
