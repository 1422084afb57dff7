use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::types::UserResponse;
use axum::{http::StatusCode, response::IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    (StatusCode::OK, Json(UserResponse::from_user(&user, false))).into_response()
}
