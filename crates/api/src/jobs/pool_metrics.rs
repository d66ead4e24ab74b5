//! Background job to record connection pool metrics.

use sqlx::PgPool;

use super::scheduler::{Job, JobError, JobFrequency};

/// Periodically publishes connection pool gauges. Only registered with the
/// postgres backend.
pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), JobError> {
        persistence::metrics::record_pool_metrics(&self.pool);
        Ok(())
    }
}
