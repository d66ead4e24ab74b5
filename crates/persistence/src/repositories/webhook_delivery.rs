//! Webhook delivery repository.
//!
//! The pending-retry set is the rows in `scheduled_retry`. Claims flip them
//! back to `pending` under `FOR UPDATE SKIP LOCKED`, so concurrent schedulers
//! never pick up the same row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{Delivery, DeliveryStatus};

use crate::entities::WebhookDeliveryEntity;
use crate::metrics::QueryTimer;
use crate::store::{DeliveryStore, StoreError};

/// Repository for webhook delivery operations.
#[derive(Clone)]
pub struct WebhookDeliveryRepository {
    pool: PgPool,
}

impl WebhookDeliveryRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, delivery: &Delivery, query_name: &str) -> Result<(), StoreError> {
        let timer = QueryTimer::new(query_name);
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_deliveries (id, webhook_id, event_id, attempt, max_attempts, status,
                                            next_retry_at, status_code, error_message,
                                            last_attempt_at, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE
            SET attempt = EXCLUDED.attempt,
                status = EXCLUDED.status,
                next_retry_at = EXCLUDED.next_retry_at,
                status_code = EXCLUDED.status_code,
                error_message = EXCLUDED.error_message,
                last_attempt_at = EXCLUDED.last_attempt_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.webhook_id)
        .bind(delivery.event_id)
        .bind(delivery.attempt as i32)
        .bind(delivery.max_attempts as i32)
        .bind(delivery.status.as_str())
        .bind(delivery.next_retry_at)
        .bind(delivery.status_code.map(i32::from))
        .bind(delivery.error_message.as_deref())
        .bind(delivery.last_attempt_at)
        .bind(delivery.completed_at)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for WebhookDeliveryRepository {
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.upsert(delivery, "insert_webhook_delivery").await
    }

    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.upsert(delivery, "update_webhook_delivery").await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let timer = QueryTimer::new("find_webhook_delivery_by_id");
        let result = sqlx::query_as::<_, WebhookDeliveryEntity>(
            r#"
            SELECT * FROM webhook_deliveries WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(Delivery::try_from).transpose()
    }

    async fn schedule_retry(&self, delivery: &Delivery) -> Result<(), StoreError> {
        if delivery.status != DeliveryStatus::ScheduledRetry || delivery.next_retry_at.is_none() {
            return Err(StoreError::Corrupt(format!(
                "delivery {} is not scheduled for retry",
                delivery.id
            )));
        }
        self.upsert(delivery, "schedule_webhook_retry").await
    }

    async fn claim_due_retries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Delivery>, StoreError> {
        let timer = QueryTimer::new("claim_due_webhook_retries");
        let result = sqlx::query_as::<_, WebhookDeliveryEntity>(
            r#"
            WITH due AS (
                SELECT id, next_retry_at AS due_at FROM webhook_deliveries
                WHERE status = 'scheduled_retry'
                  AND next_retry_at <= $1
                ORDER BY next_retry_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            ),
            claimed AS (
                UPDATE webhook_deliveries d
                SET status = 'pending', next_retry_at = NULL, updated_at = $1
                FROM due
                WHERE d.id = due.id
                RETURNING d.*, due.due_at
            )
            SELECT * FROM claimed ORDER BY due_at ASC
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result?.into_iter().map(Delivery::try_from).collect()
    }

    async fn remove_pending(&self, id: Uuid) -> Result<(), StoreError> {
        let timer = QueryTimer::new("remove_pending_webhook_retry");
        let result = sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET status = 'failed', next_retry_at = NULL, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'scheduled_retry'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn pending_retry_count(&self) -> Result<usize, StoreError> {
        let timer = QueryTimer::new("count_pending_webhook_retries");
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM webhook_deliveries WHERE status = 'scheduled_retry'
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.0.max(0) as usize)
    }
}
