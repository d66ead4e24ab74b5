//! Process-local store implementations.
//!
//! Used for development and tests. Everything lives behind tokio locks and is
//! lost when the process exits.

mod dead_letter;
mod delivery;
mod delivery_log;
mod event;
mod webhook;

pub use dead_letter::InMemoryDeadLetterStore;
pub use delivery::InMemoryDeliveryStore;
pub use delivery_log::InMemoryDeliveryLogStore;
pub use event::InMemoryEventStore;
pub use webhook::InMemoryWebhookStore;
