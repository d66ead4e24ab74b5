//! Shared utilities and common types for the home-services backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Webhook payload signing and verification (HMAC-SHA256)
//! - Signing secret generation
//! - Common validation logic
//! - List limit handling

pub mod crypto;
pub mod pagination;
pub mod validation;
