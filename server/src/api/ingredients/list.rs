use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::ingredients;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListIngredientsParams {
    /// Case-insensitive name prefix to filter by
    pub name: Option<String>,
}

/// Escape LIKE metacharacters so a prefix search can't be turned into a
/// wildcard search by the caller.
pub fn like_prefix_pattern(prefix: &str) -> String {
    format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"))
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(ListIngredientsParams),
    responses(
        (status = 200, description = "Ingredients, ordered by name", body = [Ingredient])
    )
)]
pub async fn list_ingredients(
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListIngredientsParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let mut query = ingredients::table.into_boxed();
    if let Some(ref prefix) = params.name {
        query = query.filter(ingredients::name.ilike(like_prefix_pattern(prefix)));
    }

    let results: Vec<Ingredient> = match query
        .order(ingredients::name.asc())
        .select(Ingredient::as_select())
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch ingredients: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch ingredients".to_string(),
                }),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(results)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_pattern_appends_wildcard() {
        assert_eq!(like_prefix_pattern("salt"), "salt%");
    }

    #[test]
    fn test_prefix_pattern_escapes_metacharacters() {
        assert_eq!(like_prefix_pattern("100%_a\\b"), "100\\%\\_a\\\\b%");
    }
}
