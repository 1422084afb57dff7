use crate::api::ErrorResponse;
use crate::auth::OptionalUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::{cart_items, favorites, recipes};
use crate::types::{recipe_response, PaginationMetadata, RecipeResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Number of items to return (default: 20, max: 1000)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Only recipes by this author
    pub author: Option<Uuid>,
    /// 1: only recipes the caller favorited; 0: only recipes they did not
    pub is_favorited: Option<u8>,
    /// 1: only recipes in the caller's cart; 0: only recipes not in it
    pub is_in_shopping_cart: Option<u8>,
}

/// Interpret a 0/1 query flag.
pub fn parse_flag(value: Option<u8>) -> Option<bool> {
    value.map(|v| v != 0)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    pub pagination: PaginationMetadata,
}

fn empty_page(limit: i64, offset: i64) -> ListRecipesResponse {
    ListRecipesResponse {
        recipes: Vec::new(),
        pagination: PaginationMetadata {
            total: 0,
            limit,
            offset,
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes, newest first", body = ListRecipesResponse)
    )
)]
pub async fn list_recipes(
    OptionalUser(viewer): OptionalUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let favorited_flag = parse_flag(params.is_favorited);
    let cart_flag = parse_flag(params.is_in_shopping_cart);

    // Anonymous callers asking for "my favorites" / "my cart" get an empty
    // page, not an error; the falsy flags are no-ops for them.
    if viewer.is_none() && (favorited_flag == Some(true) || cart_flag == Some(true)) {
        return (StatusCode::OK, Json(empty_page(limit, offset))).into_response();
    }

    let mut conn = get_conn!(pool);

    let mut query = recipes::table.into_boxed();

    if let Some(author) = params.author {
        query = query.filter(recipes::author_id.eq(author));
    }

    if let Some(user) = &viewer {
        if let Some(wanted) = favorited_flag {
            let favorited_ids = favorites::table
                .filter(favorites::user_id.eq(user.id))
                .select(favorites::recipe_id);
            query = if wanted {
                query.filter(recipes::id.eq_any(favorited_ids))
            } else {
                query.filter(recipes::id.ne_all(favorited_ids))
            };
        }

        if let Some(wanted) = cart_flag {
            let cart_ids = cart_items::table
                .filter(cart_items::user_id.eq(user.id))
                .select(cart_items::recipe_id);
            query = if wanted {
                query.filter(recipes::id.eq_any(cart_ids))
            } else {
                query.filter(recipes::id.ne_all(cart_ids))
            };
        }
    }

    // COUNT(*) OVER() computes the total count across all matching rows
    let rows: Vec<(Recipe, i64)> = match query
        .order(recipes::pub_date.desc())
        .limit(limit)
        .offset(offset)
        .select((Recipe::as_select(), sql::<BigInt>("COUNT(*) OVER()")))
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = rows.first().map(|(_, count)| *count).unwrap_or(0);

    let mut results = Vec::with_capacity(rows.len());
    for (recipe, _) in &rows {
        match recipe_response(&mut conn, recipe, viewer.as_ref()) {
            Ok(response) => results.push(response),
            Err(e) => {
                tracing::error!("Failed to build recipe response: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch recipes".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        Json(ListRecipesResponse {
            recipes: results,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_absent() {
        assert_eq!(parse_flag(None), None);
    }

    #[test]
    fn test_parse_flag_truthy() {
        assert_eq!(parse_flag(Some(1)), Some(true));
        assert_eq!(parse_flag(Some(2)), Some(true));
    }

    #[test]
    fn test_parse_flag_falsy() {
        assert_eq!(parse_flag(Some(0)), Some(false));
    }
}
