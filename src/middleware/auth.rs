//! Signed-request extractor for the publish API.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        FromRequest, Path, Request,
    },
    http::{header::CONTENT_TYPE, HeaderMap},
    RequestPartsExt,
};
use tracing::debug;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::services::auth::{Params, SignedRequest};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request whose signature checked out. Holds the signed parameters and the raw body.
///
/// Rejects with [`AppError::Auth`] before the handler runs, so nothing is published.
#[derive(Debug)]
pub struct Verified {
    pub app_id: String,
    pub params: Params,
    pub body: Bytes,
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Only an exceeded length limit is a 413; aborted or broken bodies are malformed.
fn body_error(rejection: BytesRejection, limit: usize) -> AppError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            AppError::PayloadTooLarge(limit)
        }
        other => AppError::MalformedRequest(other.body_text()),
    }
}

#[axum::async_trait]
impl FromRequest<AppState> for Verified {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let Path(route) = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map_err(|e| AppError::MalformedRequest(e.to_string()))?;

        let method = parts.method.clone();
        let uri = parts.uri.clone();
        let form = is_form(&parts.headers);

        // limit comes from the router's DefaultBodyLimit
        let body = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| body_error(rejection, state.max_body_bytes()))?;

        let mut params = Params::parse(uri.query().unwrap_or("").as_bytes());
        if form {
            params.extend_encoded(&body);
        }

        let request = SignedRequest::new(method.as_str(), uri.path(), params);
        let app = state
            .authenticator()
            .authenticate(&request, route.get("app_id").map(String::as_str))?;
        debug!(app_id = %app.app_id, path = %uri.path(), "request authenticated");

        Ok(Verified {
            app_id: app.app_id.clone(),
            params: request.into_params(),
            body,
        })
    }
}
