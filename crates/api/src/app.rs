use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{events, health, webhooks};
use crate::services::WebhookEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WebhookEngine>,
    pub config: Arc<Config>,
    /// Only set with the postgres storage backend.
    pub pool: Option<PgPool>,
}

pub fn create_app(config: Config, engine: Arc<WebhookEngine>, pool: Option<PgPool>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        engine,
        config: config.clone(),
        pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let webhook_routes = Router::new()
        .route(
            "/api/v1/webhooks",
            post(webhooks::register_webhook).get(webhooks::list_webhooks),
        )
        .route("/api/v1/webhooks/stats", get(webhooks::get_stats))
        .route(
            "/api/v1/webhooks/deliveries",
            get(webhooks::list_recent_delivery_logs),
        )
        .route(
            "/api/v1/webhooks/dead-letters",
            get(webhooks::list_dead_letters),
        )
        .route(
            "/api/v1/webhooks/dead-letters/:entry_id/replay",
            post(webhooks::replay_dead_letter),
        )
        .route(
            "/api/v1/webhooks/:webhook_id",
            get(webhooks::get_webhook)
                .patch(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route(
            "/api/v1/webhooks/:webhook_id/test",
            post(webhooks::test_webhook),
        )
        .route(
            "/api/v1/webhooks/:webhook_id/deliveries",
            get(webhooks::list_delivery_logs),
        )
        .route(
            "/api/v1/deliveries/:delivery_id",
            get(webhooks::get_delivery),
        )
        .route("/api/v1/events", post(events::trigger_event));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
