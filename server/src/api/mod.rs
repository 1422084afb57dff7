pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::models::{Ingredient, Tag};
use crate::types::{
    PaginationMetadata, RecipeIngredientResponse, RecipeResponse, ShortRecipeResponse,
    SubscriptionUserResponse, UserResponse,
};
use crate::validation::FieldErrors;

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Outcome of inserting a membership row (favorite, cart item, follow)
/// guarded by a unique constraint.
#[derive(Debug)]
pub enum MembershipInsert {
    Inserted,
    AlreadyPresent,
    Failed(diesel::result::Error),
}

/// A unique violation means the caller is re-adding an existing membership;
/// the constraint also covers the concurrent-duplicate race.
pub fn classify_membership_insert(result: diesel::QueryResult<usize>) -> MembershipInsert {
    match result {
        Ok(_) => MembershipInsert::Inserted,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => MembershipInsert::AlreadyPresent,
        Err(e) => MembershipInsert::Failed(e),
    }
}

/// Outcome of deleting a membership row.
#[derive(Debug)]
pub enum MembershipDelete {
    Removed,
    NotPresent,
    Failed(diesel::result::Error),
}

pub fn classify_membership_delete(result: diesel::QueryResult<usize>) -> MembershipDelete {
    match result {
        Ok(0) => MembershipDelete::NotPresent,
        Ok(_) => MembershipDelete::Removed,
        Err(e) => MembershipDelete::Failed(e),
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(components(schemas(
        ErrorResponse,
        FieldErrors,
        Ingredient,
        Tag,
        UserResponse,
        ShortRecipeResponse,
        RecipeIngredientResponse,
        RecipeResponse,
        SubscriptionUserResponse,
        PaginationMetadata,
    )))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    // Add security scheme
    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    // Merge in each module's spec
    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        auth::ApiDoc::openapi(),
        users::ApiDoc::openapi(),
        tags::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        // Merge paths
        spec.paths.paths.extend(module_spec.paths.paths);

        // Merge components (schemas)
        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_violation() -> diesel::result::Error {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        )
    }

    #[test]
    fn test_adding_an_existing_membership_is_a_duplicate() {
        assert!(matches!(
            classify_membership_insert(Err(unique_violation())),
            MembershipInsert::AlreadyPresent
        ));
        assert!(matches!(
            classify_membership_insert(Ok(1)),
            MembershipInsert::Inserted
        ));
    }

    #[test]
    fn test_removing_an_absent_membership_is_rejected() {
        assert!(matches!(
            classify_membership_delete(Ok(0)),
            MembershipDelete::NotPresent
        ));
        assert!(matches!(
            classify_membership_delete(Ok(1)),
            MembershipDelete::Removed
        ));
    }

    #[test]
    fn test_openapi_includes_shared_schemas() {
        let spec = openapi();
        let components = spec.components.expect("spec must have components");
        for name in ["ErrorResponse", "FieldErrors", "RecipeResponse"] {
            assert!(components.schemas.contains_key(name), "missing {}", name);
        }
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
