//! Webhook event repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::Event;

use crate::entities::WebhookEventEntity;
use crate::metrics::QueryTimer;
use crate::store::{EventStore, StoreError};

/// Repository for accepted events.
#[derive(Clone)]
pub struct WebhookEventRepository {
    pool: PgPool,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for WebhookEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        let timer = QueryTimer::new("insert_webhook_event");
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (id, event_type, data, metadata, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(&event.event_type)
        .bind(&event.data)
        .bind(&event.metadata)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let timer = QueryTimer::new("find_webhook_event_by_id");
        let result = sqlx::query_as::<_, WebhookEventEntity>(
            r#"
            SELECT id, event_type, data, metadata, occurred_at
            FROM webhook_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Event::from))
    }
}
