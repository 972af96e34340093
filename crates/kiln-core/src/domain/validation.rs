use crate::domain::{entities::Recipe, error::DomainError};

/// Centralized domain validation.
///
/// Catalogs and loaders go through here rather than calling entity
/// validators directly.
pub struct DomainValidator;

impl DomainValidator {
    pub fn validate_recipe(recipe: &Recipe) -> Result<(), DomainError> {
        recipe.validate()
    }
}
