//! Outbound HTTP transport for webhook deliveries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client};
use tracing::debug;

use domain::models::DeliveryOutcome;

/// A fully prepared delivery request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: HeaderMap,
    /// Exact bytes that were signed.
    pub body: Vec<u8>,
}

/// Sends prepared webhook requests and classifies the result.
///
/// Implementations never fail: every problem is folded into a
/// [`DeliveryOutcome`].
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, request: OutboundRequest) -> DeliveryOutcome;
}

/// `reqwest`-based transport used in production.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a bounded per-request timeout.
    ///
    /// Redirects are not followed; a 3xx answer counts as a failed attempt.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, request: OutboundRequest) -> DeliveryOutcome {
        let url = match reqwest::Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                return DeliveryOutcome::PermanentFailure {
                    reason: format!("Invalid URL: {}", e),
                }
            }
        };

        let result = self
            .client
            .post(url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(status_code = status, "Webhook endpoint responded");
                DeliveryOutcome::from_status(status)
            }
            Err(e) if e.is_builder() => DeliveryOutcome::PermanentFailure {
                reason: format!("Invalid request: {}", e),
            },
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    format!("Request failed: {}", e)
                };
                DeliveryOutcome::TransientFailure {
                    status_code: None,
                    reason,
                }
            }
        }
    }
}
