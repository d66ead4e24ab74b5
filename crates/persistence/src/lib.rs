//! Persistence layer for the webhook delivery engine.
//!
//! This crate contains:
//! - Storage traits the engine is written against
//! - In-memory implementations for development and tests
//! - PostgreSQL entities, repositories and migrations

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::{
    DeadLetterStore, DeliveryLogStore, DeliveryStore, EventStore, StoreError, Stores,
    WebhookStore,
};
