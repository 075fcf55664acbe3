//! Application error types for robust error handling.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Fixed body returned for every authentication failure.
pub const UNAUTHORIZED_BODY: &str = "401 UNAUTHORIZED\n";

/// Reasons a signed request is rejected. Never shown to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("unknown auth_key: {0}")]
    UnknownKey(String),

    #[error("auth_key belongs to app {expected}, request targets app {given}")]
    AppMismatch { expected: String, given: String },

    #[error("version not supported: {0}")]
    UnsupportedVersion(String),

    #[error("invalid auth_timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp expired: given {given}, not within {grace_secs}s of server time {now}")]
    TimestampExpired {
        given: i64,
        now: i64,
        grace_secs: u64,
    },

    #[error("auth_signature is not hex")]
    MalformedSignature,

    #[error("invalid secret")]
    InvalidSecret,

    #[error("invalid signature")]
    SignatureMismatch,
}

/// A single bus publish that did not go through.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("redis publish failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bus rejected publish: {0}")]
    Rejected(String),
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Publish failed on {} of {attempted} channel(s): {}", .failed.len(), .failed.join(", "))]
    Publish {
        failed: Vec<String>,
        attempted: usize,
    },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Auth(reason) = &self {
            debug!(reason = %reason, "rejected unauthenticated request");
            return (
                StatusCode::UNAUTHORIZED,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                UNAUTHORIZED_BODY,
            )
                .into_response();
        }

        let status = match &self {
            AppError::MalformedRequest(_)
            | AppError::Serialization(_)
            | AppError::InvalidChannel(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Publish { .. } | AppError::Redis(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
