use crate::api::ErrorResponse;
use crate::auth::OptionalUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::schema::users;
use crate::types::{is_following, UserResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    OptionalUser(viewer): OptionalUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let user: User = match users::table.find(id).select(User::as_select()).first(&mut conn) {
        Ok(u) => u,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "User not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch user".to_string(),
                }),
            )
                .into_response();
        }
    };

    let subscribed = match &viewer {
        Some(v) => is_following(&mut conn, v.id, user.id).unwrap_or(false),
        None => false,
    };

    (StatusCode::OK, Json(UserResponse::from_user(&user, subscribed))).into_response()
}
