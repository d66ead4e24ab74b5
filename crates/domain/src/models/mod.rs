//! Domain models for the webhook delivery engine.

pub mod dead_letter;
pub mod delivery;
pub mod delivery_log;
pub mod event;
pub mod stats;
pub mod webhook;

pub use dead_letter::DeadLetterEntry;
pub use delivery::{backoff_delay, Delivery, DeliveryOutcome, DeliveryStatus};
pub use delivery_log::DeliveryLogEntry;
pub use event::Event;
pub use stats::EngineStats;
pub use webhook::{StatCounter, Webhook, WebhookStats, WILDCARD_EVENT};
