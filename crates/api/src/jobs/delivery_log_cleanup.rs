//! Purges old webhook delivery log entries.
//!
//! Dead-letter entries are never purged.

use std::sync::Arc;

use crate::services::WebhookEngine;

use super::scheduler::{Job, JobError, JobFrequency};

pub struct DeliveryLogCleanupJob {
    engine: Arc<WebhookEngine>,
    retention_days: u32,
}

impl DeliveryLogCleanupJob {
    pub fn new(engine: Arc<WebhookEngine>, retention_days: u32) -> Self {
        Self {
            engine,
            retention_days,
        }
    }
}

#[async_trait::async_trait]
impl Job for DeliveryLogCleanupJob {
    fn name(&self) -> &'static str {
        "delivery_log_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), JobError> {
        self.engine.cleanup_delivery_logs(self.retention_days).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{EngineSettings, HttpTransport};
    use persistence::Stores;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cleanup_job() {
        let transport = HttpTransport::new(Duration::from_secs(1), "test").unwrap();
        let engine = Arc::new(WebhookEngine::new(
            Stores::in_memory(),
            Arc::new(transport),
            EngineSettings::default(),
        ));
        let job = DeliveryLogCleanupJob::new(engine, 30);

        assert_eq!(job.name(), "delivery_log_cleanup");
        assert_eq!(job.frequency(), JobFrequency::Daily);
        assert!(job.execute().await.is_ok());
    }
}
