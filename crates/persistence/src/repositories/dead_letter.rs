//! Dead-letter repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::DeadLetterEntry;

use crate::entities::DeadLetterEntity;
use crate::metrics::QueryTimer;
use crate::store::{DeadLetterStore, StoreError};

/// Repository for quarantined deliveries. Rows are never updated.
#[derive(Clone)]
pub struct DeadLetterRepository {
    pool: PgPool,
}

impl DeadLetterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_entries(entities: Vec<DeadLetterEntity>) -> Result<Vec<DeadLetterEntry>, StoreError> {
        entities.into_iter().map(DeadLetterEntry::try_from).collect()
    }
}

#[async_trait]
impl DeadLetterStore for DeadLetterRepository {
    async fn append(&self, entry: &DeadLetterEntry) -> Result<(), StoreError> {
        let snapshot = serde_json::to_value(&entry.webhook)?;
        let event = serde_json::to_value(&entry.event)?;
        let delivery = serde_json::to_value(&entry.delivery)?;

        let timer = QueryTimer::new("insert_dead_letter");
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_dead_letters (id, webhook_id, webhook_snapshot, event, delivery,
                                              quarantined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.webhook_id())
        .bind(snapshot)
        .bind(event)
        .bind(delivery)
        .bind(entry.quarantined_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEntry>, StoreError> {
        let timer = QueryTimer::new("find_dead_letter_by_id");
        let result = sqlx::query_as::<_, DeadLetterEntity>(
            r#"
            SELECT * FROM webhook_dead_letters WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(DeadLetterEntry::try_from).transpose()
    }

    async fn list(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, StoreError> {
        let timer = QueryTimer::new("list_dead_letters_by_webhook");
        let result = sqlx::query_as::<_, DeadLetterEntity>(
            r#"
            SELECT * FROM webhook_dead_letters
            WHERE webhook_id = $1
            ORDER BY quarantined_at DESC
            LIMIT $2
            "#,
        )
        .bind(webhook_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Self::into_entries(result?)
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StoreError> {
        let timer = QueryTimer::new("list_dead_letters");
        let result = sqlx::query_as::<_, DeadLetterEntity>(
            r#"
            SELECT * FROM webhook_dead_letters
            ORDER BY quarantined_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Self::into_entries(result?)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let timer = QueryTimer::new("count_dead_letters");
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT COUNT(*) FROM webhook_dead_letters")
                .fetch_one(&self.pool)
                .await;
        timer.record();
        Ok(result?.0.max(0) as usize)
    }
}
