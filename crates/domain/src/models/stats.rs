//! Engine-wide statistics.

use serde::Serialize;
use uuid::Uuid;

use super::webhook::{Webhook, WebhookStats};

/// Statistics for a single webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookStatsEntry {
    pub webhook_id: Uuid,
    pub url: String,
    pub active: bool,
    pub stats: WebhookStats,
}

impl From<&Webhook> for WebhookStatsEntry {
    fn from(w: &Webhook) -> Self {
        Self {
            webhook_id: w.id,
            url: w.url.clone(),
            active: w.active,
            stats: w.stats,
        }
    }
}

/// Snapshot of the delivery engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineStats {
    pub total_webhooks: usize,
    pub active_webhooks: usize,
    pub retry_queue_size: usize,
    pub dead_letter_queue_size: usize,
    pub per_webhook_stats: Vec<WebhookStatsEntry>,
}

impl EngineStats {
    pub fn from_webhooks(
        webhooks: &[Webhook],
        retry_queue_size: usize,
        dead_letter_queue_size: usize,
    ) -> Self {
        Self {
            total_webhooks: webhooks.len(),
            active_webhooks: webhooks.iter().filter(|w| w.active).count(),
            retry_queue_size,
            dead_letter_queue_size,
            per_webhook_stats: webhooks.iter().map(WebhookStatsEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn webhook(active: bool) -> Webhook {
        let mut w = Webhook::new(
            Uuid::new_v4(),
            "https://example.com/hook".to_string(),
            "whsec_x".to_string(),
            vec!["*".to_string()],
            "1.0".to_string(),
            BTreeMap::new(),
        );
        w.active = active;
        w
    }

    #[test]
    fn test_engine_stats_counts() {
        let webhooks = vec![webhook(true), webhook(false), webhook(true)];
        let stats = EngineStats::from_webhooks(&webhooks, 4, 2);
        assert_eq!(stats.total_webhooks, 3);
        assert_eq!(stats.active_webhooks, 2);
        assert_eq!(stats.retry_queue_size, 4);
        assert_eq!(stats.dead_letter_queue_size, 2);
        assert_eq!(stats.per_webhook_stats.len(), 3);
    }

    #[test]
    fn test_engine_stats_empty() {
        let stats = EngineStats::from_webhooks(&[], 0, 0);
        assert_eq!(stats.total_webhooks, 0);
        assert!(stats.per_webhook_stats.is_empty());
    }
}
