//! Webhook subscription registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::webhook::{
    CreateWebhookRequest, RegisteredWebhook, UpdateWebhookRequest, DEFAULT_WEBHOOK_VERSION,
    WILDCARD_EVENT,
};
use domain::models::Webhook;
use persistence::WebhookStore;
use shared::crypto::generate_webhook_secret;
use shared::validation::validate_https_url;

use super::error::WebhookError;

/// CRUD over webhook subscriptions.
#[derive(Clone)]
pub struct WebhookRegistry {
    webhooks: Arc<dyn WebhookStore>,
    require_https: bool,
}

impl WebhookRegistry {
    pub fn new(webhooks: Arc<dyn WebhookStore>, require_https: bool) -> Self {
        Self {
            webhooks,
            require_https,
        }
    }

    /// Registers a new subscription and returns it together with its secret.
    ///
    /// The secret is only ever returned here.
    pub async fn register(
        &self,
        owner_id: Uuid,
        request: CreateWebhookRequest,
    ) -> Result<RegisteredWebhook, WebhookError> {
        request.validate()?;
        self.check_url(&request.url)?;
        let headers = request.headers.unwrap_or_default();
        validate_headers(&headers)?;

        let webhook = Webhook::new(
            owner_id,
            request.url,
            generate_webhook_secret(),
            request
                .events
                .unwrap_or_else(|| vec![WILDCARD_EVENT.to_string()]),
            request
                .version
                .unwrap_or_else(|| DEFAULT_WEBHOOK_VERSION.to_string()),
            headers,
        );
        self.webhooks.insert(&webhook).await?;

        info!(
            webhook_id = %webhook.id,
            owner_id = %owner_id,
            events = ?webhook.events,
            version = %webhook.version,
            "Webhook registered"
        );

        Ok(RegisteredWebhook::from(&webhook))
    }

    /// Merges `patch` into an existing subscription.
    pub async fn update(
        &self,
        id: Uuid,
        patch: UpdateWebhookRequest,
    ) -> Result<Webhook, WebhookError> {
        patch.validate()?;
        if let Some(url) = &patch.url {
            self.check_url(url)?;
        }
        if let Some(headers) = &patch.headers {
            validate_headers(headers)?;
        }

        let webhook = self
            .webhooks
            .update(id, &patch)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!(webhook_id = %id, active = webhook.active, "Webhook updated");
        Ok(webhook)
    }

    /// Removes a subscription. Returns `false` if it did not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool, WebhookError> {
        let deleted = self.webhooks.delete(id).await?;
        if deleted {
            info!(webhook_id = %id, "Webhook deleted");
        }
        Ok(deleted)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Webhook>, WebhookError> {
        Ok(self.webhooks.get(id).await?)
    }

    /// Like [`get`](Self::get) but unknown ids are an error.
    pub async fn require(&self, id: Uuid) -> Result<Webhook, WebhookError> {
        self.get(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Webhook>, WebhookError> {
        Ok(self.webhooks.list_by_owner(owner_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Webhook>, WebhookError> {
        Ok(self.webhooks.list_all().await?)
    }

    fn check_url(&self, url: &str) -> Result<(), WebhookError> {
        if self.require_https {
            validate_https_url(url).map_err(|e| {
                WebhookError::Validation(format!(
                    "url: {}",
                    e.message.map(|m| m.to_string()).unwrap_or_default()
                ))
            })?;
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> WebhookError {
    WebhookError::NotFound(format!("Webhook {} not found", id))
}

/// Custom headers must be sendable as-is.
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), WebhookError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            WebhookError::Validation(format!("headers: invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            WebhookError::Validation(format!("headers: invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}
