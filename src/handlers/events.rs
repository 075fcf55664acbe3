//! Publish endpoints. Both require a valid request signature.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::auth::Verified;
use crate::models::channel::validate_channel_name;
use crate::models::event::{text_data, PublishRequest};

type Accepted = (StatusCode, Json<serde_json::Value>);

fn accepted() -> Accepted {
    (StatusCode::ACCEPTED, Json(json!({})))
}

/// POST /apps/:app_id/events with JSON `{name, data, channels, socket_id?}`.
pub async fn publish_events(
    State(state): State<AppState>,
    verified: Verified,
) -> AppResult<Accepted> {
    let request: PublishRequest = serde_json::from_slice(&verified.body)?;
    let channels = request.target_channels()?;
    let socket_id = request
        .socket_id
        .as_deref()
        .or_else(|| verified.params.get("socket_id"));

    state
        .publisher()
        .publish_all(&channels, &request.name, request.data.as_deref(), socket_id)
        .await
        .ensure_delivered()?;

    info!(app_id = %verified.app_id, event = %request.name, channels = channels.len(), "events accepted");
    Ok(accepted())
}

/// POST /apps/:app_id/channels/:channel_id/events. The raw body is the event data;
/// `name` (and optional `socket_id`) come from the query or form parameters.
pub async fn publish_channel_event(
    State(state): State<AppState>,
    Path((_app_id, channel_id)): Path<(String, String)>,
    verified: Verified,
) -> AppResult<Accepted> {
    validate_channel_name(&channel_id)?;
    let name = verified
        .params
        .get("name")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::MalformedRequest("missing event name".to_string()))?;
    let text = std::str::from_utf8(&verified.body)
        .map_err(|_| AppError::MalformedRequest("event data is not UTF-8".to_string()))?;
    let data = text_data(text)?;

    let channels = [channel_id];
    state
        .publisher()
        .publish_all(&channels, name, Some(&data), verified.params.get("socket_id"))
        .await
        .ensure_delivered()?;

    info!(app_id = %verified.app_id, event = %name, channel = %channels[0], "event accepted");
    Ok(accepted())
}
