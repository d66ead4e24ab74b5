//! Webhook management endpoint handlers.
//!
//! Thin adapters over [`WebhookEngine`](crate::services::WebhookEngine).
//! There is no authentication layer here; owner identity is passed
//! explicitly by the caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::dead_letter::ListDeadLettersResponse;
use domain::models::delivery_log::{DeliveryLogEntry, LimitQuery, ListDeliveryLogsResponse};
use domain::models::webhook::{
    CreateWebhookRequest, ListWebhooksQuery, ListWebhooksResponse, RegisteredWebhook,
    UpdateWebhookRequest, WebhookResponse,
};
use domain::models::{Delivery, EngineStats};

/// Registration body: the owner plus the subscription itself.
#[derive(Debug, Deserialize)]
pub struct RegisterWebhookBody {
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub webhook: CreateWebhookRequest,
}

/// Query parameters for the dead-letter listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterQuery {
    pub limit: Option<i64>,
    pub webhook_id: Option<Uuid>,
}

/// POST /api/v1/webhooks
///
/// The only response that ever carries the signing secret.
pub async fn register_webhook(
    State(state): State<AppState>,
    Json(body): Json<RegisterWebhookBody>,
) -> Result<(StatusCode, Json<RegisteredWebhook>), ApiError> {
    let registered = state
        .engine
        .register_webhook(body.owner_id, body.webhook)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// GET /api/v1/webhooks?ownerId=<uuid>
pub async fn list_webhooks(
    State(state): State<AppState>,
    Query(query): Query<ListWebhooksQuery>,
) -> Result<Json<ListWebhooksResponse>, ApiError> {
    let webhooks = state.engine.list_webhooks(query.owner_id).await?;
    let total = webhooks.len() as i64;
    Ok(Json(ListWebhooksResponse { webhooks, total }))
}

/// GET /api/v1/webhooks/:webhook_id
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<WebhookResponse>, ApiError> {
    state
        .engine
        .get_webhook(webhook_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Webhook {} not found", webhook_id)))
}

/// PATCH /api/v1/webhooks/:webhook_id
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
    Json(patch): Json<UpdateWebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    Ok(Json(state.engine.update_webhook(webhook_id, patch).await?))
}

/// DELETE /api/v1/webhooks/:webhook_id
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.engine.delete_webhook(webhook_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Webhook {} not found",
            webhook_id
        )))
    }
}

/// POST /api/v1/webhooks/:webhook_id/test
///
/// Delivers a synthetic event once and returns the resulting delivery.
pub async fn test_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<Delivery>, ApiError> {
    Ok(Json(state.engine.test_webhook(webhook_id).await?))
}

/// GET /api/v1/webhooks/:webhook_id/deliveries?limit=
pub async fn list_delivery_logs(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ListDeliveryLogsResponse>, ApiError> {
    let entries = state
        .engine
        .get_delivery_logs(webhook_id, query.limit)
        .await?;
    let total = entries.len() as i64;
    Ok(Json(ListDeliveryLogsResponse {
        webhook_id,
        entries,
        total,
    }))
}

/// GET /api/v1/webhooks/deliveries?limit=
pub async fn list_recent_delivery_logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<DeliveryLogEntry>>, ApiError> {
    Ok(Json(state.engine.get_recent_delivery_logs(query.limit).await?))
}

/// GET /api/v1/webhooks/dead-letters?limit=&webhookId=
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(query): Query<DeadLetterQuery>,
) -> Result<Json<ListDeadLettersResponse>, ApiError> {
    let entries = state
        .engine
        .get_dead_letter_queue(query.webhook_id, query.limit)
        .await?;
    let total = entries.len() as i64;
    Ok(Json(ListDeadLettersResponse { entries, total }))
}

/// POST /api/v1/webhooks/dead-letters/:entry_id/replay
pub async fn replay_dead_letter(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Delivery>, ApiError> {
    Ok(Json(state.engine.replay_dead_letter(entry_id).await?))
}

/// GET /api/v1/webhooks/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<EngineStats>, ApiError> {
    Ok(Json(state.engine.get_stats().await?))
}

/// GET /api/v1/deliveries/:delivery_id
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<Delivery>, ApiError> {
    Ok(Json(state.engine.get_delivery(delivery_id).await?))
}
