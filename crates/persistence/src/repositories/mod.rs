//! PostgreSQL store implementations.

pub mod dead_letter;
pub mod delivery_log;
pub mod webhook;
pub mod webhook_delivery;
pub mod webhook_event;

pub use dead_letter::DeadLetterRepository;
pub use delivery_log::DeliveryLogRepository;
pub use webhook::WebhookRepository;
pub use webhook_delivery::WebhookDeliveryRepository;
pub use webhook_event::WebhookEventRepository;
