//! Background job scheduler and job implementations.

mod delivery_log_cleanup;
mod pool_metrics;
mod scheduler;
mod webhook_retry;

pub use delivery_log_cleanup::DeliveryLogCleanupJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobError, JobFrequency, JobScheduler};
pub use webhook_retry::WebhookRetryJob;
