use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewRecipe, NewRecipeIngredient, NewRecipeTag, Recipe};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags};
use crate::types::{recipe_response, IngredientAmount, RecipeResponse};
use crate::validation::{validate_recipe_payload, FieldErrors};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fields are optional at the serde level so an absent field reaches
/// validation and comes back as a per-field 400 instead of a 422.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// Base64 image data-URL
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
}

pub(super) fn all_ingredients_exist(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> QueryResult<bool> {
    let found: i64 = ingredients::table
        .filter(ingredients::id.eq_any(ids))
        .count()
        .get_result(conn)?;
    Ok(found == ids.len() as i64)
}

pub(super) fn all_tags_exist(conn: &mut PgConnection, ids: &[Uuid]) -> QueryResult<bool> {
    let found: i64 = tags::table
        .filter(tags::id.eq_any(ids))
        .count()
        .get_result(conn)?;
    Ok(found == ids.len() as i64)
}

/// Deduplicate tag ids while keeping their order.
pub(super) fn dedup_tags(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Build the recipe_ingredients rows for a submitted ingredient set. The
/// write paths delete any existing rows first, so this is the complete set
/// the recipe holds after the write.
pub(super) fn ingredient_rows(
    recipe_id: Uuid,
    ingredient_amounts: &[IngredientAmount],
) -> Vec<NewRecipeIngredient> {
    ingredient_amounts
        .iter()
        .map(|item| NewRecipeIngredient {
            recipe_id,
            ingredient_id: item.id,
            amount: item.amount,
        })
        .collect()
}

/// Insert the join rows of a recipe. Callers run this inside the same
/// transaction as the recipe row itself so a failed insert never leaves a
/// recipe without ingredients.
pub(super) fn insert_recipe_rows(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    ingredient_amounts: &[IngredientAmount],
    tag_ids: &[Uuid],
) -> QueryResult<()> {
    diesel::insert_into(recipe_ingredients::table)
        .values(ingredient_rows(recipe_id, ingredient_amounts))
        .execute(conn)?;

    if !tag_ids.is_empty() {
        let tag_rows: Vec<NewRecipeTag> = tag_ids
            .iter()
            .map(|tag_id| NewRecipeTag {
                recipe_id,
                tag_id: *tag_id,
            })
            .collect();
        diesel::insert_into(recipe_tags::table)
            .values(&tag_rows)
            .execute(conn)?;
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = FieldErrors),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown ingredient or tag id", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<CreateRecipeRequest>,
) -> impl IntoResponse {
    let errors = validate_recipe_payload(
        req.name.as_deref(),
        req.text.as_deref(),
        req.cooking_time,
        req.image.as_deref(),
        &req.ingredients,
    );
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    // Validation guarantees these are present
    let name = req.name.as_deref().unwrap_or_default();
    let text = req.text.as_deref().unwrap_or_default();
    let image = req.image.as_deref().unwrap_or_default();
    let cooking_time = req.cooking_time.unwrap_or_default();

    let mut conn = get_conn!(pool);

    let ingredient_ids: Vec<Uuid> = req.ingredients.iter().map(|item| item.id).collect();
    match all_ingredients_exist(&mut conn, &ingredient_ids) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Ingredient not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to check ingredients: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    let tag_ids = dedup_tags(&req.tags);
    match all_tags_exist(&mut conn, &tag_ids) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Tag not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to check tags: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    // Recipe and its join rows are written as a single atomic unit
    let result: Result<Recipe, diesel::result::Error> = conn.transaction(|conn| {
        let new_recipe = NewRecipe {
            author_id: user.id,
            name,
            image,
            text,
            cooking_time,
        };

        let recipe: Recipe = diesel::insert_into(recipes::table)
            .values(&new_recipe)
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        insert_recipe_rows(conn, recipe.id, &req.ingredients, &tag_ids)?;

        Ok(recipe)
    });

    let recipe = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to create recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    match recipe_response(&mut conn, &recipe, Some(&user)) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build recipe response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
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
    fn test_dedup_tags_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_tags(&[a, b, a, b, a]), vec![a, b]);
    }

    #[test]
    fn test_dedup_tags_empty() {
        assert!(dedup_tags(&[]).is_empty());
    }

    #[test]
    fn test_payload_without_image_deserializes_and_fails_validation() {
        let payload = format!(
            r#"{{"name": "Borscht", "text": "Boil.", "cooking_time": 60,
                "ingredients": [{{"id": "{}", "amount": 5}}]}}"#,
            Uuid::new_v4()
        );
        let req: CreateRecipeRequest =
            serde_json::from_str(&payload).expect("missing image must not fail deserialization");
        assert!(req.image.is_none());

        let errors = validate_recipe_payload(
            req.name.as_deref(),
            req.text.as_deref(),
            req.cooking_time,
            req.image.as_deref(),
            &req.ingredients,
        );
        assert_eq!(
            errors.0.get("image").map(Vec::as_slice),
            Some(&["image is required".to_string()][..])
        );
    }

    #[test]
    fn test_payload_without_ingredients_deserializes_and_fails_validation() {
        let req: CreateRecipeRequest = serde_json::from_str(
            r#"{"name": "Borscht", "text": "Boil.", "cooking_time": 60,
                "image": "data:image/png;base64,aGk="}"#,
        )
        .expect("missing ingredients must not fail deserialization");
        assert!(req.ingredients.is_empty());

        let errors = validate_recipe_payload(
            req.name.as_deref(),
            req.text.as_deref(),
            req.cooking_time,
            req.image.as_deref(),
            &req.ingredients,
        );
        assert!(errors.0.contains_key("ingredients"));
    }

    #[test]
    fn test_ingredient_rows_cover_exactly_the_submitted_set() {
        let recipe_id = Uuid::new_v4();
        let items = vec![
            IngredientAmount {
                id: Uuid::new_v4(),
                amount: 3,
            },
            IngredientAmount {
                id: Uuid::new_v4(),
                amount: 150,
            },
        ];
        let rows = ingredient_rows(recipe_id, &items);
        assert_eq!(rows.len(), items.len());
        for (row, item) in rows.iter().zip(&items) {
            assert_eq!(row.recipe_id, recipe_id);
            assert_eq!(row.ingredient_id, item.id);
            assert_eq!(row.amount, item.amount);
        }
    }
}
