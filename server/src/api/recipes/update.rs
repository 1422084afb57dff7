use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::{recipe_ingredients, recipe_tags, recipes};
use crate::types::{recipe_response, IngredientAmount, RecipeResponse};
use crate::validation::{validate_recipe_payload, FieldErrors};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::create::{all_ingredients_exist, all_tags_exist, dedup_tags, insert_recipe_rows};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// Base64 image data-URL. Required, as on create; absence is a field error.
    pub image: Option<String>,
    /// Full replacement for the recipe's ingredient set
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    /// Full replacement for the recipe's tag set; omit to keep the current tags
    pub tags: Option<Vec<Uuid>>,
}

/// Merge a partial update with the stored recipe. Name, text and cooking time
/// fall back to the stored values; image and ingredients always come from the
/// request and the submitted ingredient set fully replaces the stored one.
fn merge_recipe_fields<'a>(req: &'a UpdateRecipeRequest, stored: &'a Recipe) -> (&'a str, &'a str, i32) {
    (
        req.name.as_deref().unwrap_or(&stored.name),
        req.text.as_deref().unwrap_or(&stored.text),
        req.cooking_time.unwrap_or(stored.cooking_time),
    )
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = FieldErrors),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the recipe author", body = ErrorResponse),
        (status = 404, description = "Recipe, ingredient or tag not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecipeRequest>,
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

    if recipe.author_id != user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Only the author can edit this recipe".to_string(),
            }),
        )
            .into_response();
    }

    // Merge optional fields with the stored recipe, then validate the result
    let (name, text, cooking_time) = merge_recipe_fields(&req, &recipe);

    let errors = validate_recipe_payload(
        Some(name),
        Some(text),
        Some(cooking_time),
        req.image.as_deref(),
        &req.ingredients,
    );
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    // Validation guarantees presence
    let image = req.image.as_deref().unwrap_or_default();

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
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    let tag_ids = req.tags.as_deref().map(dedup_tags);
    if let Some(ref ids) = tag_ids {
        match all_tags_exist(&mut conn, ids) {
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
                        error: "Failed to update recipe".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    // All prior ingredient rows are dropped and rewritten from the submitted
    // set inside one transaction, so a failure can't leave the recipe with a
    // partial ingredient list.
    let result: Result<Recipe, diesel::result::Error> = conn.transaction(|conn| {
        let updated: Recipe = diesel::update(recipes::table.find(recipe.id))
            .set((
                recipes::name.eq(name),
                recipes::text.eq(text),
                recipes::cooking_time.eq(cooking_time),
                recipes::image.eq(image),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        diesel::delete(
            recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe.id)),
        )
        .execute(conn)?;

        if tag_ids.is_some() {
            diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe.id)))
                .execute(conn)?;
        }

        insert_recipe_rows(
            conn,
            recipe.id,
            &req.ingredients,
            tag_ids.as_deref().unwrap_or(&[]),
        )?;

        Ok(updated)
    });

    let updated = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to update recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    match recipe_response(&mut conn, &updated, Some(&user)) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build recipe response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_recipe() -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            name: "Borscht".to_string(),
            image: "data:image/png;base64,aGk=".to_string(),
            text: "Boil.".to_string(),
            cooking_time: 60,
            pub_date: Utc::now(),
        }
    }

    fn request(json: &str) -> UpdateRecipeRequest {
        serde_json::from_str(json).expect("request must deserialize")
    }

    #[test]
    fn test_merge_keeps_stored_fields_when_omitted() {
        let stored = stored_recipe();
        let req = request(r#"{"image": "data:image/png;base64,aGk=", "ingredients": []}"#);
        let (name, text, cooking_time) = merge_recipe_fields(&req, &stored);
        assert_eq!(name, "Borscht");
        assert_eq!(text, "Boil.");
        assert_eq!(cooking_time, 60);
    }

    #[test]
    fn test_merge_prefers_submitted_fields() {
        let stored = stored_recipe();
        let req = request(
            r#"{"name": "Green borscht", "cooking_time": 45,
                "image": "data:image/png;base64,aGk=", "ingredients": []}"#,
        );
        let (name, text, cooking_time) = merge_recipe_fields(&req, &stored);
        assert_eq!(name, "Green borscht");
        assert_eq!(text, "Boil.");
        assert_eq!(cooking_time, 45);
    }

    #[test]
    fn test_update_without_image_is_a_field_error() {
        let stored = stored_recipe();
        let req = request(r#"{"name": "Green borscht", "ingredients": []}"#);
        let (name, text, cooking_time) = merge_recipe_fields(&req, &stored);
        let errors = validate_recipe_payload(
            Some(name),
            Some(text),
            Some(cooking_time),
            req.image.as_deref(),
            &req.ingredients,
        );
        assert_eq!(
            errors.0.get("image").map(Vec::as_slice),
            Some(&["image is required".to_string()][..])
        );
    }
}
