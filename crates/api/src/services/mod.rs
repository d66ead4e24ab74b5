//! Webhook delivery engine services.

pub mod delivery;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod registry;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use delivery::DeliveryWorker;
pub use dispatcher::EventDispatcher;
pub use engine::{EngineSettings, WebhookEngine};
pub use error::WebhookError;
pub use registry::WebhookRegistry;
pub use retry::RetryScheduler;
pub use transport::{HttpTransport, OutboundRequest, WebhookTransport};
