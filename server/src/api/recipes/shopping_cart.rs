use crate::api::{
    classify_membership_delete, classify_membership_insert, ErrorResponse, MembershipDelete,
    MembershipInsert,
};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewCartItem, Recipe};
use crate::schema::{cart_items, recipes};
use crate::types::ShortRecipeResponse;
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
    post,
    path = "/api/recipes/{id}/shopping_cart",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Recipe added to the shopping cart", body = ShortRecipeResponse),
        (status = 400, description = "Recipe already in the cart", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe: Recipe = match recipes::table
        .find(id)
        .select(Recipe::as_select())
        .first(&mut conn)
    {
        Ok(r) => r,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Recipe not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    let new_item = NewCartItem {
        user_id: user.id,
        recipe_id: recipe.id,
    };

    let result = diesel::insert_into(cart_items::table)
        .values(&new_item)
        .execute(&mut conn);

    match classify_membership_insert(result) {
        MembershipInsert::Inserted => (
            StatusCode::CREATED,
            Json(ShortRecipeResponse::from_recipe(&recipe)),
        )
            .into_response(),
        MembershipInsert::AlreadyPresent => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Recipe is already in the shopping cart".to_string(),
            }),
        )
            .into_response(),
        MembershipInsert::Failed(e) => {
            tracing::error!("Failed to add to cart: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to add to cart".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/shopping_cart",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe removed from the shopping cart"),
        (status = 400, description = "Recipe not in the cart", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_from_cart(
    AuthUser(user): AuthUser,
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
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove from cart".to_string(),
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

    let result = diesel::delete(
        cart_items::table
            .filter(cart_items::user_id.eq(user.id))
            .filter(cart_items::recipe_id.eq(id)),
    )
    .execute(&mut conn);

    match classify_membership_delete(result) {
        MembershipDelete::NotPresent => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Recipe is not in the shopping cart".to_string(),
            }),
        )
            .into_response(),
        MembershipDelete::Removed => StatusCode::NO_CONTENT.into_response(),
        MembershipDelete::Failed(e) => {
            tracing::error!("Failed to remove from cart: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove from cart".to_string(),
                }),
            )
                .into_response()
        }
    }
}
