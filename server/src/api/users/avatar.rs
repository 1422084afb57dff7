use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::users;
use crate::validation::{validate_avatar, FieldErrors};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Optional at the serde level so an absent field surfaces as a per-field
/// 400 instead of a 422.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AvatarRequest {
    /// Base64 image data-URL
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/users/me/avatar",
    tag = "users",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = AvatarResponse),
        (status = 400, description = "Invalid avatar", body = FieldErrors),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn put_avatar(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<AvatarRequest>,
) -> impl IntoResponse {
    let errors = validate_avatar(req.avatar.as_deref());
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    // Validation guarantees presence
    let avatar = req.avatar.unwrap_or_default();

    let mut conn = get_conn!(pool);

    match diesel::update(users::table.find(user.id))
        .set((
            users::avatar.eq(Some(avatar.as_str())),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
    {
        Ok(_) => (
            StatusCode::OK,
            Json(AvatarResponse {
                avatar: Some(avatar),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update avatar: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update avatar".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/me/avatar",
    tag = "users",
    responses(
        (status = 204, description = "Avatar removed"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_avatar(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match diesel::update(users::table.find(user.id))
        .set((
            users::avatar.eq(None::<String>),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("Failed to remove avatar: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove avatar".to_string(),
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
    fn test_payload_without_avatar_deserializes_and_fails_validation() {
        let req: AvatarRequest =
            serde_json::from_str("{}").expect("missing avatar must not fail deserialization");
        assert!(req.avatar.is_none());

        let errors = validate_avatar(req.avatar.as_deref());
        assert_eq!(
            errors.0.get("avatar").map(Vec::as_slice),
            Some(&["avatar is required".to_string()][..])
        );
    }
}
