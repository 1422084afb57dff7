pub mod avatar;
pub mod get;
pub mod list;
pub mod me;
pub mod subscribe;
pub mod subscriptions;

use crate::AppState;
use axum::routing::{get, post, put};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/users endpoints (mounted at /api/users)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_users))
        .route("/me", get(me::me))
        .route(
            "/me/avatar",
            put(avatar::put_avatar).delete(avatar::delete_avatar),
        )
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route("/{id}", get(get::get_user))
        .route(
            "/{id}/subscribe",
            post(subscribe::subscribe).delete(subscribe::unsubscribe),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_users,
        get::get_user,
        me::me,
        avatar::put_avatar,
        avatar::delete_avatar,
        subscriptions::list_subscriptions,
        subscribe::subscribe,
        subscribe::unsubscribe,
    ),
    components(schemas(
        list::ListUsersResponse,
        avatar::AvatarRequest,
        avatar::AvatarResponse,
        subscriptions::ListSubscriptionsResponse,
    ))
)]
pub struct ApiDoc;
