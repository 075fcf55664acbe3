//! Shared state and the health check.

use axum::{http::StatusCode, Json};
use serde_json::json;

use crate::services::{EventPublisher, OccupancyService, SignatureAuthenticator};

/// Shared application state for the HTTP API.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: SignatureAuthenticator,
    pub publisher: EventPublisher,
    pub occupancy: OccupancyService,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn authenticator(&self) -> &SignatureAuthenticator {
        &self.authenticator
    }
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }
    pub fn occupancy(&self) -> &OccupancyService {
        &self.occupancy
    }
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

/// GET /health: liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "notif-gateway" })),
    )
}
