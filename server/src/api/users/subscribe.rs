use crate::api::{
    classify_membership_delete, classify_membership_insert, ErrorResponse, MembershipDelete,
    MembershipInsert,
};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewFollow, User};
use crate::schema::{follows, users};
use crate::types::{subscription_user_response, SubscriptionUserResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscribeParams {
    /// Cap on the number of recipes included per author in the response
    pub recipes_limit: Option<i64>,
}

/// A user may not follow themselves; the CHECK constraint on follows is the
/// backstop.
fn is_self_follow(user_id: Uuid, author_id: Uuid) -> bool {
    user_id == author_id
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(("id" = Uuid, Path, description = "Author ID"), SubscribeParams),
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionUserResponse),
        (status = 400, description = "Self-follow or already subscribed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn subscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Query(params): Query<SubscribeParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let author: User = match users::table.find(id).select(User::as_select()).first(&mut conn) {
        Ok(a) => a,
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

    if is_self_follow(user.id, author.id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "You cannot subscribe to yourself".to_string(),
            }),
        )
            .into_response();
    }

    let new_follow = NewFollow {
        user_id: user.id,
        author_id: author.id,
    };

    let result = diesel::insert_into(follows::table)
        .values(&new_follow)
        .execute(&mut conn);

    match classify_membership_insert(result) {
        MembershipInsert::Inserted => {}
        MembershipInsert::AlreadyPresent => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "You are already subscribed to this user".to_string(),
                }),
            )
                .into_response()
        }
        MembershipInsert::Failed(e) => {
            tracing::error!("Failed to create follow: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match subscription_user_response(&mut conn, &user, &author, params.recipes_limit) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build subscription response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not currently subscribed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let author_exists: bool = match diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(id)),
    ))
    .get_result(&mut conn)
    {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to fetch user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to unsubscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if !author_exists {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "User not found".to_string(),
            }),
        )
            .into_response();
    }

    let result = diesel::delete(
        follows::table
            .filter(follows::user_id.eq(user.id))
            .filter(follows::author_id.eq(id)),
    )
    .execute(&mut conn);

    match classify_membership_delete(result) {
        MembershipDelete::NotPresent => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "You are not subscribed to this user".to_string(),
            }),
        )
            .into_response(),
        MembershipDelete::Removed => StatusCode::NO_CONTENT.into_response(),
        MembershipDelete::Failed(e) => {
            tracing::error!("Failed to delete follow: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to unsubscribe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_following_yourself_is_rejected() {
        let id = Uuid::new_v4();
        assert!(is_self_follow(id, id));
        assert!(!is_self_follow(id, Uuid::new_v4()));
    }

    #[test]
    fn test_subscribing_twice_is_a_duplicate() {
        let duplicate = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        );
        assert!(matches!(
            classify_membership_insert(Err(duplicate)),
            MembershipInsert::AlreadyPresent
        ));
    }
}
