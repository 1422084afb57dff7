use crate::api::ErrorResponse;
use crate::auth::OptionalUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::schema::{follows, users};
use crate::types::{PaginationMetadata, UserResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Number of items to return (default: 20, max: 1000)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PaginationMetadata,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "Users ordered by username", body = ListUsersResponse)
    )
)]
pub async fn list_users(
    OptionalUser(viewer): OptionalUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListUsersParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut conn = get_conn!(pool);

    let total: i64 = match users::table.count().get_result(&mut conn) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to count users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch users".to_string(),
                }),
            )
                .into_response();
        }
    };

    let page: Vec<User> = match users::table
        .order(users::username.asc())
        .limit(limit)
        .offset(offset)
        .select(User::as_select())
        .load(&mut conn)
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to fetch users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch users".to_string(),
                }),
            )
                .into_response();
        }
    };

    // One query for the viewer's whole follow set instead of one per row
    let followed: HashSet<Uuid> = match &viewer {
        Some(user) => match follows::table
            .filter(follows::user_id.eq(user.id))
            .select(follows::author_id)
            .load::<Uuid>(&mut conn)
        {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::error!("Failed to fetch follows: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch users".to_string(),
                    }),
                )
                    .into_response();
            }
        },
        None => HashSet::new(),
    };

    let users = page
        .iter()
        .map(|u| UserResponse::from_user(u, followed.contains(&u.id)))
        .collect();

    (
        StatusCode::OK,
        Json(ListUsersResponse {
            users,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}
