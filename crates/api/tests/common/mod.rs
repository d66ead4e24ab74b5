//! Common test utilities for integration tests.
//!
//! Everything runs against the in-memory storage backend and a scripted
//! transport, so no database or network is needed unless a test opts in.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use fake::{Fake, Faker};
use uuid::Uuid;

use domain::models::webhook::{CreateWebhookRequest, RegisteredWebhook};
use domain::models::DeliveryOutcome;
use homeservices_api::app::create_app;
use homeservices_api::config::{
    Config, DatabaseConfig, DeliveryConfig, LoggingConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
use homeservices_api::services::{
    EngineSettings, OutboundRequest, WebhookEngine, WebhookTransport,
};
use persistence::Stores;

/// Create a test configuration backed by in-memory storage.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        delivery: DeliveryConfig {
            request_timeout_secs: 5,
            max_attempts: 5,
            worker_concurrency: 4,
            retry_scan_interval_secs: 30,
            retry_batch_size: 100,
            require_https: false,
            log_retention_days: 30,
            user_agent: "homeservices-webhooks-test".to_string(),
        },
    }
}

/// Transport double that records every request and answers from a script.
pub struct FakeTransport {
    script: Mutex<VecDeque<DeliveryOutcome>>,
    fallback: DeliveryOutcome,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl FakeTransport {
    pub fn ok() -> Arc<Self> {
        Self::always(DeliveryOutcome::Success { status_code: 200 })
    }

    pub fn always(outcome: DeliveryOutcome) -> Arc<Self> {
        Self::scripted(Vec::new(), outcome)
    }

    pub fn scripted(script: Vec<DeliveryOutcome>, fallback: DeliveryOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }
}

#[async_trait]
impl WebhookTransport for FakeTransport {
    async fn post(&self, request: OutboundRequest) -> DeliveryOutcome {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Engine settings matching [`test_config`].
pub fn test_settings() -> EngineSettings {
    EngineSettings::from_config(&test_config().delivery)
}

pub fn create_test_engine(transport: Arc<FakeTransport>) -> Arc<WebhookEngine> {
    Arc::new(WebhookEngine::new(
        Stores::in_memory(),
        transport,
        test_settings(),
    ))
}

/// Create a test application together with the engine behind it.
pub fn create_test_app(transport: Arc<FakeTransport>) -> (Router, Arc<WebhookEngine>) {
    let engine = create_test_engine(transport);
    let app = create_app(test_config(), engine.clone(), None);
    (app, engine)
}

/// A partner endpoint URL with a random path.
pub fn partner_url() -> String {
    let path: Uuid = Faker.fake();
    format!("https://partner.example.com/hooks/{}", path)
}

pub fn random_owner() -> Uuid {
    Faker.fake()
}

pub fn webhook_request(url: &str, events: &[&str]) -> CreateWebhookRequest {
    CreateWebhookRequest {
        url: url.to_string(),
        events: Some(events.iter().map(|e| e.to_string()).collect()),
        version: None,
        headers: None,
    }
}

pub fn webhook_request_with_headers(
    url: &str,
    events: &[&str],
    headers: &[(&str, &str)],
) -> CreateWebhookRequest {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    CreateWebhookRequest {
        headers: Some(headers),
        ..webhook_request(url, events)
    }
}

/// Register a webhook directly on the engine.
pub async fn register_test_webhook(
    engine: &WebhookEngine,
    url: &str,
    events: &[&str],
) -> RegisteredWebhook {
    engine
        .register_webhook(random_owner(), webhook_request(url, events))
        .await
        .expect("Failed to register webhook")
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a bodyless POST request.
pub fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a DELETE request.
pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
