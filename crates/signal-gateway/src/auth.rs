//! Authenticated-caller identity extraction.
//!
//! Authentication itself happens upstream (an access-control proxy in
//! front of this gateway); by the time a request arrives here the
//! caller's identity sits in the `x-user-id` header and is trusted
//! as-is. This extractor only makes its absence explicit.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const IDENTITY_HEADER: &str = "x-user-id";

/// The identity injected by the upstream access-control layer.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| AuthUser(value.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "missing authenticated identity" })),
                )
                    .into_response()
            })
    }
}
