use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::recipes;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

pub fn build_short_link(scheme: &str, host: &str, id: Uuid) -> String {
    format!("{}://{}/s/{}", scheme, host, id)
}

/// Scheme the client reached us with. Behind a TLS-terminating proxy the
/// original scheme arrives in X-Forwarded-Proto.
fn request_scheme(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http")
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/get-link",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Short link for the recipe", body = ShortLinkResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn get_link(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe_exists: bool = match diesel::select(diesel::dsl::exists(
        recipes::table.filter(recipes::id.eq(id)),
    ))
    .get_result(&mut conn)
    {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to build link".to_string(),
                }),
            )
                .into_response();
        }
    };

    if !recipe_exists {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:3000");

    (
        StatusCode::OK,
        Json(ShortLinkResponse {
            short_link: build_short_link(request_scheme(&headers), host, id),
        }),
    )
        .into_response()
}

/// Resolve a short link (`/s/{id}`) to the recipe resource.
#[utoipa::path(
    get,
    path = "/s/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses(
        (status = 307, description = "Redirect to the recipe resource"),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn resolve_short_link(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe_exists: bool = match diesel::select(diesel::dsl::exists(
        recipes::table.filter(recipes::id.eq(id)),
    ))
    .get_result(&mut conn)
    {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to resolve short link: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to resolve link".to_string(),
                }),
            )
                .into_response();
        }
    };

    if !recipe_exists {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response();
    }

    Redirect::temporary(&format!("/api/recipes/{}", id)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_short_link() {
        let id = Uuid::nil();
        assert_eq!(
            build_short_link("http", "mealgram.example", id),
            "http://mealgram.example/s/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            build_short_link("https", "mealgram.example", id),
            "https://mealgram.example/s/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_request_scheme_follows_forwarded_proto() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_scheme(&headers), "http");

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(request_scheme(&headers), "https");
    }
}
