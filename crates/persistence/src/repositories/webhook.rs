//! Webhook repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::webhook::UpdateWebhookRequest;
use domain::models::{StatCounter, Webhook, WILDCARD_EVENT};

use crate::entities::WebhookEntity;
use crate::metrics::QueryTimer;
use crate::store::{StoreError, WebhookStore};

/// Repository for webhook-related database operations.
#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    /// Creates a new WebhookRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_webhooks(entities: Vec<WebhookEntity>) -> Result<Vec<Webhook>, StoreError> {
        entities.into_iter().map(Webhook::try_from).collect()
    }
}

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn insert(&self, webhook: &Webhook) -> Result<(), StoreError> {
        let headers = serde_json::to_value(&webhook.headers)?;
        let timer = QueryTimer::new("insert_webhook");
        let result = sqlx::query(
            r#"
            INSERT INTO webhooks (id, owner_id, url, secret, events, version, headers, active,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(webhook.id)
        .bind(webhook.owner_id)
        .bind(&webhook.url)
        .bind(&webhook.secret)
        .bind(&webhook.events)
        .bind(&webhook.version)
        .bind(headers)
        .bind(webhook.active)
        .bind(webhook.created_at)
        .bind(webhook.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Webhook>, StoreError> {
        let timer = QueryTimer::new("find_webhook_by_id");
        let result = sqlx::query_as::<_, WebhookEntity>(
            r#"
            SELECT * FROM webhooks WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(Webhook::try_from).transpose()
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, StoreError> {
        let timer = QueryTimer::new("list_webhooks_by_owner");
        let result = sqlx::query_as::<_, WebhookEntity>(
            r#"
            SELECT * FROM webhooks
            WHERE owner_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Self::into_webhooks(result?)
    }

    async fn list_all(&self) -> Result<Vec<Webhook>, StoreError> {
        let timer = QueryTimer::new("list_all_webhooks");
        let result = sqlx::query_as::<_, WebhookEntity>(
            r#"
            SELECT * FROM webhooks ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Self::into_webhooks(result?)
    }

    async fn find_active_for_event(&self, event_type: &str) -> Result<Vec<Webhook>, StoreError> {
        let timer = QueryTimer::new("find_active_webhooks_for_event");
        let result = sqlx::query_as::<_, WebhookEntity>(
            r#"
            SELECT * FROM webhooks
            WHERE active = true
              AND ($1 = ANY(events) OR $2 = ANY(events))
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_type)
        .bind(WILDCARD_EVENT)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Self::into_webhooks(result?)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &UpdateWebhookRequest,
    ) -> Result<Option<Webhook>, StoreError> {
        let headers = patch
            .headers
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let timer = QueryTimer::new("update_webhook");
        let result = sqlx::query_as::<_, WebhookEntity>(
            r#"
            UPDATE webhooks
            SET url = COALESCE($2, url),
                events = COALESCE($3, events),
                headers = COALESCE($4, headers),
                active = COALESCE($5, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.url.as_deref())
        .bind(patch.events.as_ref())
        .bind(headers)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(Webhook::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_webhook");
        let result = sqlx::query(
            r#"
            DELETE FROM webhooks WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn increment_stat(&self, id: Uuid, counter: StatCounter) -> Result<(), StoreError> {
        // Column names come from a closed enum, never from input.
        let query = format!(
            "UPDATE webhooks SET stats_{0} = stats_{0} + 1 WHERE id = $1",
            counter.as_str()
        );
        let timer = QueryTimer::new("increment_webhook_stat");
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await;
        timer.record();
        result?;
        Ok(())
    }
}
