//! Webhook entity (database row mapping).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Webhook, WebhookStats};

use crate::store::StoreError;

/// Database row mapping for the webhooks table.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub secret: String,
    pub events: Vec<String>,
    pub version: String,
    pub headers: serde_json::Value,
    pub active: bool,
    pub stats_total: i64,
    pub stats_successful: i64,
    pub stats_failed: i64,
    pub stats_retried: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookEntity> for Webhook {
    type Error = StoreError;

    fn try_from(entity: WebhookEntity) -> Result<Self, Self::Error> {
        let headers: BTreeMap<String, String> = serde_json::from_value(entity.headers)?;
        Ok(Self {
            id: entity.id,
            owner_id: entity.owner_id,
            url: entity.url,
            secret: entity.secret,
            events: entity.events,
            version: entity.version,
            headers,
            active: entity.active,
            stats: WebhookStats {
                total: entity.stats_total.max(0) as u64,
                successful: entity.stats_successful.max(0) as u64,
                failed: entity.stats_failed.max(0) as u64,
                retried: entity.stats_retried.max(0) as u64,
            },
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
