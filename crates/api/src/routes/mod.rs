//! HTTP route handlers.

pub mod events;
pub mod health;
pub mod webhooks;
