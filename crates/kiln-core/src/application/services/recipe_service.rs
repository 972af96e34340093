//! Recipe Service - recipe lookup and registration.
//!
//! Separated from the runner: finding a recipe has nothing to do with
//! executing one.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    application::ports::RecipeCatalog,
    domain::{DomainValidator as validator, Recipe},
    error::KilnResult,
};

/// Information about a recipe for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub steps: usize,
    pub destructive_steps: usize,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id(),
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            description: recipe.description.clone(),
            steps: recipe.step_count(),
            destructive_steps: recipe.destructive_steps().count(),
        }
    }
}

/// Service for recipe catalog operations.
pub struct RecipeService {
    catalog: Box<dyn RecipeCatalog>,
}

impl RecipeService {
    pub fn new(catalog: Box<dyn RecipeCatalog>) -> Self {
        Self { catalog }
    }

    /// Get a recipe by name.
    pub fn get(&self, name: &str) -> KilnResult<Recipe> {
        self.catalog.get(name)
    }

    /// Validate and add (or replace) a recipe.
    #[instrument(skip_all, fields(recipe = %recipe.id()))]
    pub fn save(&self, recipe: Recipe) -> KilnResult<()> {
        validator::validate_recipe(&recipe)?;
        debug!("Registering recipe");
        self.catalog.insert(recipe)
    }

    /// List all recipes.
    pub fn list(&self) -> KilnResult<Vec<Recipe>> {
        self.catalog.list()
    }

    /// Display summaries of all recipes, sorted by name.
    pub fn summaries(&self) -> KilnResult<Vec<RecipeSummary>> {
        Ok(self.list()?.iter().map(RecipeSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::application::ApplicationError;
    use crate::domain::{Step, StepAction, ToolInvocation};
    use crate::error::KilnError;

    #[derive(Default)]
    struct MapCatalog(Mutex<BTreeMap<String, Recipe>>);

    impl RecipeCatalog for MapCatalog {
        fn list(&self) -> KilnResult<Vec<Recipe>> {
            Ok(self.0.lock().unwrap().values().cloned().collect())
        }

        fn get(&self, name: &str) -> KilnResult<Recipe> {
            self.0
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| {
                    ApplicationError::RecipeNotFound {
                        name: name.to_string(),
                    }
                    .into()
                })
        }

        fn insert(&self, recipe: Recipe) -> KilnResult<()> {
            self.0.lock().unwrap().insert(recipe.name.clone(), recipe);
            Ok(())
        }
    }

    fn sample() -> Recipe {
        Recipe::builder()
            .name("api")
            .description("API starter")
            .step(Step::new(
                "reset",
                StepAction::RunExternal(
                    ToolInvocation::new("bin/rails")
                        .arg("db:reset")
                        .destructive(),
                ),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn save_then_summarize() {
        let service = RecipeService::new(Box::new(MapCatalog::default()));
        service.save(sample()).unwrap();

        let summaries = service.summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "api@0.1.0");
        assert_eq!(summaries[0].destructive_steps, 1);
    }

    #[test]
    fn save_rejects_invalid_recipe() {
        let service = RecipeService::new(Box::new(MapCatalog::default()));
        let mut bad = sample();
        bad.steps.clear();
        assert!(matches!(service.save(bad), Err(KilnError::Domain(_))));
    }

    #[test]
    fn missing_recipe_is_not_found() {
        let service = RecipeService::new(Box::new(MapCatalog::default()));
        assert!(matches!(
            service.get("nope"),
            Err(KilnError::Application(ApplicationError::RecipeNotFound { .. }))
        ));
    }
}
