use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::{cart_items, ingredients, recipe_ingredients};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diesel::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sum amounts per (ingredient name, unit). The BTreeMap keeps the list
/// ordered by name for rendering.
pub fn aggregate_cart(rows: Vec<(String, String, i32)>) -> BTreeMap<(String, String), i64> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for (name, unit, amount) in rows {
        *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
    }
    totals
}

pub fn render_shopping_list(totals: &BTreeMap<(String, String), i64>) -> String {
    let mut lines = vec!["Shopping list:".to_string()];
    for ((name, unit), total) in totals {
        lines.push(format!("{} ({}) - {}", name, unit, total));
    }
    lines.join("\n")
}

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    tag = "recipes",
    responses(
        (status = 200, description = "Aggregated shopping list as a plain-text attachment", body = String, content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Shopping cart is empty", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    // One row per (recipe in cart, ingredient); the same ingredient can
    // appear for several recipes and is summed below.
    let rows: Vec<(String, String, i32)> = match cart_items::table
        .inner_join(
            recipe_ingredients::table
                .on(recipe_ingredients::recipe_id.eq(cart_items::recipe_id)),
        )
        .inner_join(
            ingredients::table.on(ingredients::id.eq(recipe_ingredients::ingredient_id)),
        )
        .filter(cart_items::user_id.eq(user.id))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            recipe_ingredients::amount,
        ))
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch shopping cart: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch shopping cart".to_string(),
                }),
            )
                .into_response();
        }
    };

    if rows.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Shopping cart is empty".to_string(),
            }),
        )
            .into_response();
    }

    let body = render_shopping_list(&aggregate_cart(rows));

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"shopping_list.txt\"",
        )
        .body(Body::from(body))
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build shopping list response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to build shopping list".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> (String, String, i32) {
        (name.to_string(), unit.to_string(), amount)
    }

    #[test]
    fn test_aggregate_sums_same_ingredient_across_recipes() {
        let totals = aggregate_cart(vec![
            row("flour", "g", 200),
            row("flour", "g", 300),
            row("milk", "ml", 250),
        ]);
        assert_eq!(totals[&("flour".to_string(), "g".to_string())], 500);
        assert_eq!(totals[&("milk".to_string(), "ml".to_string())], 250);
    }

    #[test]
    fn test_aggregate_keeps_units_distinct() {
        let totals = aggregate_cart(vec![row("sugar", "g", 100), row("sugar", "tbsp", 2)]);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&("sugar".to_string(), "g".to_string())], 100);
        assert_eq!(totals[&("sugar".to_string(), "tbsp".to_string())], 2);
    }

    #[test]
    fn test_render_orders_by_name() {
        let totals = aggregate_cart(vec![
            row("salt", "g", 5),
            row("butter", "g", 50),
            row("flour", "g", 200),
        ]);
        let text = render_shopping_list(&totals);
        assert_eq!(
            text,
            "Shopping list:\nbutter (g) - 50\nflour (g) - 200\nsalt (g) - 5"
        );
    }

    #[test]
    fn test_aggregate_handles_large_sums() {
        let totals = aggregate_cart(vec![row("rice", "g", 32000), row("rice", "g", 32000)]);
        assert_eq!(totals[&("rice".to_string(), "g".to_string())], 64000);
    }
}
