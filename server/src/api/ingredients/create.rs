use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{Ingredient, NewIngredient};
use crate::schema::ingredients;
use crate::validation::{validate_ingredient, FieldErrors};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub measurement_unit: String,
}

#[utoipa::path(
    post,
    path = "/api/ingredients",
    tag = "ingredients",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Ingredient created", body = Ingredient),
        (status = 400, description = "Invalid request", body = FieldErrors),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Ingredient already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_ingredient(
    AuthUser(_user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<CreateIngredientRequest>,
) -> impl IntoResponse {
    let errors = validate_ingredient(&req.name, &req.measurement_unit);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }

    let mut conn = get_conn!(pool);

    let new_ingredient = NewIngredient {
        name: req.name,
        measurement_unit: req.measurement_unit,
    };

    match diesel::insert_into(ingredients::table)
        .values(&new_ingredient)
        .returning(Ingredient::as_returning())
        .get_result::<Ingredient>(&mut conn)
    {
        Ok(ingredient) => (StatusCode::CREATED, Json(ingredient)).into_response(),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "An ingredient with this name and unit already exists".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to create ingredient: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create ingredient".to_string(),
                }),
            )
                .into_response()
        }
    }
}
