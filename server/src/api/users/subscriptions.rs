use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::schema::{follows, users};
use crate::types::{subscription_user_response, PaginationMetadata, SubscriptionUserResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSubscriptionsParams {
    /// Number of items to return (default: 20, max: 1000)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Cap on the number of recipes included per author
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionUserResponse>,
    pub pagination: PaginationMetadata,
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(ListSubscriptionsParams),
    responses(
        (status = 200, description = "Authors the caller follows, newest follow first", body = ListSubscriptionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListSubscriptionsParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut conn = get_conn!(pool);

    let total: i64 = match follows::table
        .filter(follows::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)
    {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to count subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    let authors: Vec<User> = match follows::table
        .inner_join(users::table.on(users::id.eq(follows::author_id)))
        .filter(follows::user_id.eq(user.id))
        .order(follows::created_at.desc())
        .limit(limit)
        .offset(offset)
        .select(User::as_select())
        .load(&mut conn)
    {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Failed to fetch subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    let mut subscriptions = Vec::with_capacity(authors.len());
    for author in &authors {
        match subscription_user_response(&mut conn, &user, author, params.recipes_limit) {
            Ok(response) => subscriptions.push(response),
            Err(e) => {
                tracing::error!("Failed to build subscription response: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch subscriptions".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        Json(ListSubscriptionsResponse {
            subscriptions,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}
