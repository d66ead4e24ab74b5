//! Domain layer for the home-services webhook delivery engine.
//!
//! This crate contains:
//! - Domain models (Webhook, Event, Delivery, DeadLetterEntry, DeliveryLogEntry)
//! - Request/response payloads for the management surface
//! - Payload rendering and retry backoff rules

pub mod models;
pub mod services;
