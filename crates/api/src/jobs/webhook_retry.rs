//! Fires webhook deliveries whose retry is due.

use std::sync::Arc;

use tracing::debug;

use crate::services::WebhookEngine;

use super::scheduler::{Job, JobError, JobFrequency};

pub struct WebhookRetryJob {
    engine: Arc<WebhookEngine>,
    interval_secs: u64,
}

impl WebhookRetryJob {
    pub fn new(engine: Arc<WebhookEngine>, interval_secs: u64) -> Self {
        Self {
            engine,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for WebhookRetryJob {
    fn name(&self) -> &'static str {
        "webhook_retry"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), JobError> {
        let fired = self.engine.process_retries().await;
        debug!(fired = fired, "Webhook retry scan finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{EngineSettings, HttpTransport};
    use persistence::Stores;
    use std::time::Duration;

    fn job(interval_secs: u64) -> WebhookRetryJob {
        let transport = HttpTransport::new(Duration::from_secs(1), "test").unwrap();
        let engine = WebhookEngine::new(
            Stores::in_memory(),
            Arc::new(transport),
            EngineSettings::default(),
        );
        WebhookRetryJob::new(Arc::new(engine), interval_secs)
    }

    #[test]
    fn test_frequency_follows_configured_interval() {
        let job = job(45);
        assert_eq!(job.name(), "webhook_retry");
        assert_eq!(job.frequency(), JobFrequency::Seconds(45));
    }

    #[tokio::test]
    async fn test_execute_with_empty_queue() {
        assert!(job(30).execute().await.is_ok());
    }
}
