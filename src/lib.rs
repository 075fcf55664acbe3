//! Signed HTTP ingress for a Pusher-style pub/sub notification service.
//!
//! Backend clients publish events over HTTP; requests are verified against a
//! per-app shared secret and forwarded to Redis pub/sub, one message per
//! channel. Read-only endpoints relay channel occupancy from the presence
//! registry.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use services::{EventPublisher, OccupancyService, SignatureAuthenticator};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use handlers::{channels, events, http};
use tower_http::trace::TraceLayer;

/// Build the API router. Used by main and by integration tests.
///
/// Routes are kept flat: the signature covers the full request path, which
/// a nested router would strip.
pub fn create_app(state: AppState) -> axum::Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes());
    axum::Router::new()
        .route("/apps/:app_id/events", post(events::publish_events))
        .route("/apps/:app_id/channels", get(channels::list_channels))
        .route(
            "/apps/:app_id/channels/:channel_id",
            get(channels::channel_info),
        )
        .route(
            "/apps/:app_id/channels/:channel_id/users",
            get(channels::channel_users),
        )
        .route(
            "/apps/:app_id/channels/:channel_id/events",
            post(events::publish_channel_event),
        )
        .route("/health", get(http::health))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
