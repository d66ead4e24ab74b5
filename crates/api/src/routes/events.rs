//! Event intake endpoint.

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::RequestId;
use domain::models::event::{TriggerEventRequest, TriggerEventResponse};

/// POST /api/v1/events
///
/// Accepts the event and returns its id right away. Deliveries happen in the
/// background, so the response says nothing about their outcome.
pub async fn trigger_event(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<TriggerEventRequest>,
) -> Result<(StatusCode, Json<TriggerEventResponse>), ApiError> {
    let event_id = state
        .engine
        .trigger_event(&request.event_type, request.data, request.metadata)
        .await?;

    if let Some(Extension(RequestId(request_id))) = request_id {
        info!(event_id = %event_id, request_id = %request_id, "Event accepted");
    }

    Ok((StatusCode::ACCEPTED, Json(TriggerEventResponse { event_id })))
}
