//! Errors surfaced by the webhook engine to its callers.

use persistence::StoreError;
use thiserror::Error;

/// Errors returned by management operations.
///
/// Delivery-time failures never show up here. They are absorbed by the
/// engine and only become visible through logs, stats and the dead-letter
/// queue.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<validator::ValidationErrors> for WebhookError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        messages.sort();
        WebhookError::Validation(messages.join(", "))
    }
}

impl From<shared::crypto::CryptoError> for WebhookError {
    fn from(error: shared::crypto::CryptoError) -> Self {
        WebhookError::Validation(error.to_string())
    }
}
