//! Axum extractors for session handles.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::session::{Session, Sessions};

const MISSING_LAYER: (StatusCode, &str) =
    (StatusCode::INTERNAL_SERVER_ERROR, "Session layer not installed");

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or(MISSING_LAYER)
    }
}

impl<S> FromRequestParts<S> for Sessions
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts.extensions.get::<Sessions>().cloned().ok_or(MISSING_LAYER)
    }
}
