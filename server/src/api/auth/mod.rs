pub mod login;
pub mod signup;

use crate::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/auth endpoints (no auth required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
}

#[derive(OpenApi)]
#[openapi(
    paths(signup::signup, login::login),
    components(schemas(
        signup::SignupRequest,
        signup::SignupResponse,
        login::LoginRequest,
        login::LoginResponse,
    ))
)]
pub struct ApiDoc;
