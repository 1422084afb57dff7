use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::models::User;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::convert::Infallible;
use std::sync::Arc;

use super::db::get_user_from_token;

/// Extractor for endpoints that require a valid bearer token. Rejects with
/// 401 when the token is missing, malformed, expired or unknown.
pub struct AuthUser(pub User);

/// Extractor for endpoints that behave differently for authenticated callers
/// but never reject: an invalid or absent token yields `None`.
pub struct OptionalUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = <Arc<DbPool> as FromRef<S>>::from_ref(state);

        let token = bearer_token(parts)
            .ok_or_else(|| unauthorized("Missing or invalid Authorization header"))?;

        match get_user_from_token(&pool, token).await {
            Some(user) => Ok(AuthUser(user)),
            None => Err(unauthorized("Invalid or expired token")),
        }
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = <Arc<DbPool> as FromRef<S>>::from_ref(state);

        let user = match bearer_token(parts) {
            Some(token) => get_user_from_token(&pool, token).await,
            None => None,
        };

        Ok(OptionalUser(user))
    }
}
