//! Delivery log repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::DeliveryLogEntry;

use crate::entities::DeliveryLogEntity;
use crate::metrics::QueryTimer;
use crate::store::{DeliveryLogStore, StoreError};

/// Repository for per-attempt delivery history.
#[derive(Clone)]
pub struct DeliveryLogRepository {
    pool: PgPool,
}

impl DeliveryLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLogStore for DeliveryLogRepository {
    async fn append(&self, entry: &DeliveryLogEntry) -> Result<(), StoreError> {
        let timer = QueryTimer::new("insert_delivery_log");
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_delivery_logs (id, webhook_id, delivery_id, event_id, event_type,
                                               attempt, success, status_code, error_message,
                                               duration_ms, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.webhook_id)
        .bind(entry.delivery_id)
        .bind(entry.event_id)
        .bind(&entry.event_type)
        .bind(entry.attempt as i32)
        .bind(entry.success)
        .bind(entry.status_code.map(i32::from))
        .bind(entry.error_message.as_deref())
        .bind(entry.duration_ms.min(i64::MAX as u64) as i64)
        .bind(entry.attempted_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn list(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DeliveryLogEntry>, StoreError> {
        let timer = QueryTimer::new("list_delivery_logs_by_webhook");
        let result = sqlx::query_as::<_, DeliveryLogEntity>(
            r#"
            SELECT * FROM webhook_delivery_logs
            WHERE webhook_id = $1
            ORDER BY attempted_at DESC
            LIMIT $2
            "#,
        )
        .bind(webhook_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(DeliveryLogEntry::from).collect())
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>, StoreError> {
        let timer = QueryTimer::new("list_delivery_logs");
        let result = sqlx::query_as::<_, DeliveryLogEntity>(
            r#"
            SELECT * FROM webhook_delivery_logs
            ORDER BY attempted_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(DeliveryLogEntry::from).collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_old_delivery_logs");
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_delivery_logs
            WHERE attempted_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
