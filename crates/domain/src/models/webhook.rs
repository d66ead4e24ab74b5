//! Webhook domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::{validate_event_types, validate_http_scheme};

/// Event type that subscribes a webhook to every event.
pub const WILDCARD_EVENT: &str = "*";

/// Wire schema version used when none is requested.
pub const DEFAULT_WEBHOOK_VERSION: &str = "1.0";

/// Per-webhook delivery counters.
///
/// Counters only grow for the lifetime of the webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookStats {
    /// HTTP attempts actually issued.
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    /// Retries scheduled after a failed attempt.
    pub retried: u64,
}

/// Counter selector for atomic stat increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    Total,
    Successful,
    Failed,
    Retried,
}

impl StatCounter {
    /// Column / field name of the counter.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatCounter::Total => "total",
            StatCounter::Successful => "successful",
            StatCounter::Failed => "failed",
            StatCounter::Retried => "retried",
        }
    }
}

/// A subscription of an external HTTP endpoint to domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Webhook {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    /// Signing key. Only ever handed out once, at registration.
    pub secret: String,
    pub events: Vec<String>,
    pub version: String,
    pub headers: BTreeMap<String, String>,
    pub active: bool,
    pub stats: WebhookStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// Builds a new, active webhook with zeroed statistics.
    pub fn new(
        owner_id: Uuid,
        url: String,
        secret: String,
        events: Vec<String>,
        version: String,
        headers: BTreeMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            url,
            secret,
            events,
            version,
            headers,
            active: true,
            stats: WebhookStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this webhook subscribes to `event_type`, directly or via `*`.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e == WILDCARD_EVENT || e == event_type)
    }

    /// Whether an event of `event_type` should be delivered to this webhook now.
    pub fn accepts(&self, event_type: &str) -> bool {
        self.active && self.subscribes_to(event_type)
    }

    /// Applies a partial update. Fields absent from the patch are left as is.
    pub fn apply_update(&mut self, patch: UpdateWebhookRequest) {
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(events) = patch.events {
            self.events = events;
        }
        if let Some(headers) = patch.headers {
            self.headers = headers;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_at = Utc::now();
    }
}

/// Request payload for registering a webhook.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateWebhookRequest {
    #[validate(
        url(message = "Invalid URL format"),
        length(max = 2048, message = "URL must be at most 2048 characters")
    )]
    #[validate(custom(function = "validate_http_scheme"))]
    pub url: String,

    #[validate(custom(function = "validate_event_list"))]
    pub events: Option<Vec<String>>,

    #[validate(length(min = 1, max = 16, message = "Version must be 1-16 characters"))]
    pub version: Option<String>,

    pub headers: Option<BTreeMap<String, String>>,
}

/// Request payload for updating a webhook (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateWebhookRequest {
    #[validate(
        url(message = "Invalid URL format"),
        length(max = 2048, message = "URL must be at most 2048 characters")
    )]
    #[validate(custom(function = "validate_http_scheme"))]
    pub url: Option<String>,

    #[validate(custom(function = "validate_event_list"))]
    pub events: Option<Vec<String>>,

    pub headers: Option<BTreeMap<String, String>>,

    pub active: Option<bool>,
}

fn validate_event_list(events: &[String]) -> Result<(), validator::ValidationError> {
    validate_event_types(events)
}

/// Returned once, at registration. The only place the secret is exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisteredWebhook {
    pub id: Uuid,
    pub secret: String,
    pub url: String,
    pub events: Vec<String>,
    pub version: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Webhook> for RegisteredWebhook {
    fn from(w: &Webhook) -> Self {
        Self {
            id: w.id,
            secret: w.secret.clone(),
            url: w.url.clone(),
            events: w.events.clone(),
            version: w.version.clone(),
            active: w.active,
            created_at: w.created_at,
        }
    }
}

/// Read projection of a webhook. Never carries the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub version: String,
    pub headers: BTreeMap<String, String>,
    pub active: bool,
    pub stats: WebhookStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Webhook> for WebhookResponse {
    fn from(w: Webhook) -> Self {
        Self {
            id: w.id,
            owner_id: w.owner_id,
            url: w.url,
            events: w.events,
            version: w.version,
            headers: w.headers,
            active: w.active,
            stats: w.stats,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Response for listing webhooks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListWebhooksResponse {
    pub webhooks: Vec<WebhookResponse>,
    pub total: i64,
}

/// Query parameters for listing webhooks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWebhooksQuery {
    pub owner_id: Uuid,
}

/// Point-in-time copy of a webhook stored alongside dead-lettered deliveries.
///
/// The secret is deliberately not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub version: String,
    pub active: bool,
}

impl From<&Webhook> for WebhookSnapshot {
    fn from(w: &Webhook) -> Self {
        Self {
            id: w.id,
            owner_id: w.owner_id,
            url: w.url.clone(),
            events: w.events.clone(),
            version: w.version.clone(),
            active: w.active,
        }
    }
}
