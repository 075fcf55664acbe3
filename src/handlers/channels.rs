//! Read-only occupancy endpoints. No signature required.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::handlers::http::AppState;
use crate::models::channel::{ChannelInfoResponse, ChannelUsersResponse, ChannelsResponse};

/// GET /apps/:app_id/channels
pub async fn list_channels(State(state): State<AppState>) -> AppResult<Json<ChannelsResponse>> {
    let channels = state.occupancy().occupied_channels().await?;
    Ok(Json(ChannelsResponse { channels }))
}

/// GET /apps/:app_id/channels/:channel_id
pub async fn channel_info(
    State(state): State<AppState>,
    Path((_app_id, channel_id)): Path<(String, String)>,
) -> AppResult<Json<ChannelInfoResponse>> {
    let user_count = state.occupancy().user_count(&channel_id).await?;
    Ok(Json(ChannelInfoResponse { user_count }))
}

/// GET /apps/:app_id/channels/:channel_id/users
pub async fn channel_users(
    State(state): State<AppState>,
    Path((_app_id, channel_id)): Path<(String, String)>,
) -> AppResult<Json<ChannelUsersResponse>> {
    let users = state.occupancy().users(&channel_id).await?;
    Ok(Json(ChannelUsersResponse { users }))
}
