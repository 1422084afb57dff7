//! Request payload validation shared by the recipe and user endpoints.
//!
//! Field violations are collected into a [`FieldErrors`] map rendered as the
//! response body of a 400, one entry per offending field.

use crate::types::IngredientAmount;
use base64::Engine;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const MAX_RECIPE_NAME_LENGTH: usize = 128;
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 128;
pub const MAX_MEASUREMENT_UNIT_LENGTH: usize = 64;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Per-field validation messages, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Check that a string is a base64 image data-URL (`data:image/...;base64,...`)
/// whose payload actually decodes.
pub fn is_image_data_url(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return false;
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    !payload.is_empty()
        && base64::engine::general_purpose::STANDARD
            .decode(payload)
            .is_ok()
}

fn check_text_field(errors: &mut FieldErrors, field: &str, value: &str, max_length: usize) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} cannot be empty", field));
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("{} must be at most {} characters", field, max_length),
        );
    }
}

/// Validate a recipe write payload. Ingredient/tag id resolvability is checked
/// against the database separately; everything shape-level lives here.
///
/// Fields arrive as `Option` so a missing field surfaces here as a per-field
/// error instead of a deserialization failure.
pub fn validate_recipe_payload(
    name: Option<&str>,
    text: Option<&str>,
    cooking_time: Option<i32>,
    image: Option<&str>,
    ingredients: &[IngredientAmount],
) -> FieldErrors {
    let mut errors = FieldErrors::default();

    match name {
        None => errors.add("name", "name is required"),
        Some(name) => check_text_field(&mut errors, "name", name, MAX_RECIPE_NAME_LENGTH),
    }

    match text {
        None => errors.add("text", "text is required"),
        Some(text) if text.trim().is_empty() => errors.add("text", "text cannot be empty"),
        Some(_) => {}
    }

    match cooking_time {
        None => errors.add("cooking_time", "cooking_time is required"),
        Some(cooking_time) if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) => {
            errors.add(
                "cooking_time",
                format!(
                    "cooking_time must be between {} and {}",
                    MIN_COOKING_TIME, MAX_COOKING_TIME
                ),
            );
        }
        Some(_) => {}
    }

    match image {
        None => errors.add("image", "image is required"),
        Some(image) if image.trim().is_empty() => errors.add("image", "image is required"),
        Some(image) if !is_image_data_url(image) => {
            errors.add("image", "image must be a base64 image data-URL");
        }
        Some(_) => {}
    }

    if ingredients.is_empty() {
        errors.add("ingredients", "ingredients cannot be empty");
    } else {
        let mut seen = HashSet::new();
        for item in ingredients {
            if !seen.insert(item.id) {
                errors.add("ingredients", "ingredient ids must be unique");
                break;
            }
        }
        if ingredients
            .iter()
            .any(|item| !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount))
        {
            errors.add(
                "ingredients",
                format!("amount must be between {} and {}", MIN_AMOUNT, MAX_AMOUNT),
            );
        }
    }

    errors
}

/// Validate a signup payload.
pub fn validate_signup(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if email.trim().is_empty() || !email.contains('@') {
        errors.add("email", "a valid email is required");
    } else if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.add(
            "email",
            format!("email must be at most {} characters", MAX_EMAIL_LENGTH),
        );
    }

    check_text_field(&mut errors, "username", username, MAX_USERNAME_LENGTH);
    if !username.is_empty()
        && !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "username may contain only letters, digits and @.+-_",
        );
    }

    check_text_field(&mut errors, "first_name", first_name, MAX_USERNAME_LENGTH);
    check_text_field(&mut errors, "last_name", last_name, MAX_USERNAME_LENGTH);

    if password.is_empty() {
        errors.add("password", "password cannot be empty");
    }

    errors
}

/// Validate an avatar payload, `None` meaning the field was absent.
pub fn validate_avatar(avatar: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::default();
    match avatar {
        None => errors.add("avatar", "avatar is required"),
        Some(avatar) if !is_image_data_url(avatar) => {
            errors.add("avatar", "avatar must be a base64 image data-URL");
        }
        Some(_) => {}
    }
    errors
}

/// Validate a new ingredient.
pub fn validate_ingredient(name: &str, measurement_unit: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    check_text_field(&mut errors, "name", name, MAX_INGREDIENT_NAME_LENGTH);
    check_text_field(
        &mut errors,
        "measurement_unit",
        measurement_unit,
        MAX_MEASUREMENT_UNIT_LENGTH,
    );
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // 1x1 transparent PNG
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn one_ingredient() -> Vec<IngredientAmount> {
        vec![IngredientAmount {
            id: Uuid::new_v4(),
            amount: 5,
        }]
    }

    fn validate(
        name: &str,
        text: &str,
        cooking_time: i32,
        image: &str,
        ingredients: &[IngredientAmount],
    ) -> FieldErrors {
        validate_recipe_payload(
            Some(name),
            Some(text),
            Some(cooking_time),
            Some(image),
            ingredients,
        )
    }

    #[test]
    fn test_valid_payload_passes() {
        let errors = validate("Borscht", "Chop and boil.", 60, PNG_DATA_URL, &one_ingredient());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_empty_ingredient_list_rejected() {
        let errors = validate("Borscht", "Boil.", 60, PNG_DATA_URL, &[]);
        assert!(errors.0.contains_key("ingredients"));
    }

    #[test]
    fn test_duplicate_ingredient_ids_rejected() {
        let id = Uuid::new_v4();
        let ingredients = vec![
            IngredientAmount { id, amount: 2 },
            IngredientAmount { id, amount: 7 },
        ];
        let errors = validate("Borscht", "Boil.", 60, PNG_DATA_URL, &ingredients);
        assert_eq!(
            errors.0.get("ingredients").map(Vec::as_slice),
            Some(&["ingredient ids must be unique".to_string()][..])
        );
    }

    #[test]
    fn test_cooking_time_bounds() {
        for bad in [0, -5, 32001] {
            let errors = validate("Borscht", "Boil.", bad, PNG_DATA_URL, &one_ingredient());
            assert!(errors.0.contains_key("cooking_time"), "accepted {}", bad);
        }
        for ok in [1, 32000] {
            let errors = validate("Borscht", "Boil.", ok, PNG_DATA_URL, &one_ingredient());
            assert!(errors.is_empty(), "rejected {}", ok);
        }
    }

    #[test]
    fn test_amount_bounds() {
        let ingredients = vec![IngredientAmount {
            id: Uuid::new_v4(),
            amount: 0,
        }];
        let errors = validate("Borscht", "Boil.", 60, PNG_DATA_URL, &ingredients);
        assert!(errors.0.contains_key("ingredients"));
    }

    #[test]
    fn test_image_required() {
        let errors = validate("Borscht", "Boil.", 60, "", &one_ingredient());
        assert_eq!(
            errors.0.get("image").map(Vec::as_slice),
            Some(&["image is required".to_string()][..])
        );
    }

    #[test]
    fn test_image_must_be_data_url() {
        let errors = validate("Borscht", "Boil.", 60, "https://x.test/a.png", &one_ingredient());
        assert!(errors.0.contains_key("image"));
    }

    #[test]
    fn test_missing_fields_reported_per_field() {
        let errors = validate_recipe_payload(None, None, None, None, &one_ingredient());
        for field in ["name", "text", "cooking_time", "image"] {
            assert_eq!(
                errors.0.get(field).map(Vec::as_slice),
                Some(&[format!("{} is required", field)][..]),
                "missing {}",
                field
            );
        }
    }

    #[test]
    fn test_errors_accumulate_per_field() {
        let errors = validate("", "", 0, "", &[]);
        for field in ["name", "text", "cooking_time", "image", "ingredients"] {
            assert!(errors.0.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn test_avatar_validation() {
        assert!(validate_avatar(Some(PNG_DATA_URL)).is_empty());
        assert_eq!(
            validate_avatar(None).0.get("avatar").map(Vec::as_slice),
            Some(&["avatar is required".to_string()][..])
        );
        assert!(validate_avatar(Some("https://x.test/a.png"))
            .0
            .contains_key("avatar"));
    }

    #[test]
    fn test_is_image_data_url() {
        assert!(is_image_data_url(PNG_DATA_URL));
        assert!(!is_image_data_url("data:image/png;base64,"));
        assert!(!is_image_data_url("data:image/png;base64,!!!not-base64!!!"));
        assert!(!is_image_data_url("data:text/plain;base64,aGVsbG8="));
    }

    #[test]
    fn test_signup_validation() {
        let errors = validate_signup("ada@example.com", "ada", "Ada", "Lovelace", "secret");
        assert!(errors.is_empty());

        let errors = validate_signup("not-an-email", "bad name!", "", "", "");
        for field in ["email", "username", "first_name", "last_name", "password"] {
            assert!(errors.0.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn test_recipe_name_length_limit() {
        let long_name = "x".repeat(MAX_RECIPE_NAME_LENGTH + 1);
        let errors = validate(&long_name, "Boil.", 60, PNG_DATA_URL, &one_ingredient());
        assert!(errors.0.contains_key("name"));
    }
}
