//! Shared wire types and representation builders used by multiple endpoints.

use crate::db::DbConn;
use crate::models::{Ingredient, Recipe, Tag, User};
use crate::schema::{
    cart_items, favorites, follows, ingredients, recipe_ingredients, recipe_tags, recipes, tags,
    users,
};
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One ingredient reference inside a recipe payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientAmount {
    /// Ingredient ID
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    /// Whether the requesting user follows this user
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShortRecipeResponse {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipeResponse {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        ShortRecipeResponse {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub name: String,
    pub author: UserResponse,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub tags: Vec<Tag>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub pub_date: DateTime<Utc>,
}

/// A followed author together with their recipes, as returned by the
/// subscription endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items available
    pub total: i64,
    /// Number of items requested (limit)
    pub limit: i64,
    /// Number of items skipped (offset)
    pub offset: i64,
}

pub fn is_following(conn: &mut DbConn, user_id: Uuid, author_id: Uuid) -> QueryResult<bool> {
    diesel::select(exists(
        follows::table
            .filter(follows::user_id.eq(user_id))
            .filter(follows::author_id.eq(author_id)),
    ))
    .get_result(conn)
}

pub fn is_favorited(conn: &mut DbConn, user_id: Uuid, recipe_id: Uuid) -> QueryResult<bool> {
    diesel::select(exists(
        favorites::table
            .filter(favorites::user_id.eq(user_id))
            .filter(favorites::recipe_id.eq(recipe_id)),
    ))
    .get_result(conn)
}

pub fn is_in_cart(conn: &mut DbConn, user_id: Uuid, recipe_id: Uuid) -> QueryResult<bool> {
    diesel::select(exists(
        cart_items::table
            .filter(cart_items::user_id.eq(user_id))
            .filter(cart_items::recipe_id.eq(recipe_id)),
    ))
    .get_result(conn)
}

/// Build the full recipe representation. The viewer (if any) determines the
/// is_subscribed / is_favorited / is_in_shopping_cart flags.
pub fn recipe_response(
    conn: &mut DbConn,
    recipe: &Recipe,
    viewer: Option<&User>,
) -> QueryResult<RecipeResponse> {
    let author: User = users::table
        .find(recipe.author_id)
        .select(User::as_select())
        .first(conn)?;

    let ingredient_rows: Vec<(Ingredient, i32)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq(recipe.id))
        .order(ingredients::name.asc())
        .select((Ingredient::as_select(), recipe_ingredients::amount))
        .load(conn)?;

    let recipe_tags: Vec<Tag> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq(recipe.id))
        .order(tags::name.asc())
        .select(Tag::as_select())
        .load(conn)?;

    let (subscribed, favorited, in_cart) = match viewer {
        Some(user) => (
            is_following(conn, user.id, author.id)?,
            is_favorited(conn, user.id, recipe.id)?,
            is_in_cart(conn, user.id, recipe.id)?,
        ),
        None => (false, false, false),
    };

    Ok(RecipeResponse {
        id: recipe.id,
        name: recipe.name.clone(),
        author: UserResponse::from_user(&author, subscribed),
        image: recipe.image.clone(),
        text: recipe.text.clone(),
        cooking_time: recipe.cooking_time,
        ingredients: ingredient_rows
            .into_iter()
            .map(|(ingredient, amount)| RecipeIngredientResponse {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount,
            })
            .collect(),
        tags: recipe_tags,
        is_favorited: favorited,
        is_in_shopping_cart: in_cart,
        pub_date: recipe.pub_date,
    })
}

/// Build the subscription representation of an author: user fields plus their
/// recipes (optionally trimmed to `recipes_limit`) and total recipe count.
pub fn subscription_user_response(
    conn: &mut DbConn,
    viewer: &User,
    author: &User,
    recipes_limit: Option<i64>,
) -> QueryResult<SubscriptionUserResponse> {
    let recipes_count: i64 = recipes::table
        .filter(recipes::author_id.eq(author.id))
        .count()
        .get_result(conn)?;

    let mut query = recipes::table
        .filter(recipes::author_id.eq(author.id))
        .order(recipes::pub_date.desc())
        .into_boxed();
    if let Some(limit) = recipes_limit {
        query = query.limit(limit.max(0));
    }
    let author_recipes: Vec<Recipe> = query.select(Recipe::as_select()).load(conn)?;

    let subscribed = is_following(conn, viewer.id, author.id)?;

    Ok(SubscriptionUserResponse {
        user: UserResponse::from_user(author, subscribed),
        recipes: author_recipes
            .iter()
            .map(ShortRecipeResponse::from_recipe)
            .collect(),
        recipes_count,
    })
}
