//! In-memory recipe catalog with built-in recipes.

use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, RwLock},
};

use kiln_core::{
    application::{ApplicationError, ports::RecipeCatalog},
    domain::{DomainValidator as validator, Recipe},
    error::{KilnError, KilnResult},
};
use tracing::debug;

use crate::{builtin_recipes, recipe_loader::RecipeLoader};

/// Thread-safe in-memory recipe catalog, keyed by recipe name.
#[derive(Clone)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<BTreeMap<String, Recipe>>>,
}

impl InMemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Create a catalog with built-in recipes loaded.
    pub fn with_builtin() -> KilnResult<Self> {
        let catalog = Self::new();
        catalog.load_builtin()?;
        Ok(catalog)
    }

    /// Load built-in recipes.
    pub fn load_builtin(&self) -> KilnResult<()> {
        for recipe in builtin_recipes::all_recipes()? {
            self.insert(recipe)?;
        }
        Ok(())
    }

    /// Load every recipe file under `dir`. Recipes with the name of an
    /// existing entry replace it.
    pub fn load_dir(&self, dir: &Path) -> KilnResult<usize> {
        let recipes = RecipeLoader::new(dir).load_all()?;
        let count = recipes.len();
        for recipe in recipes {
            debug!(name = %recipe.name, "Registering recipe from disk");
            self.insert(recipe)?;
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeCatalog for InMemoryCatalog {
    fn list(&self) -> KilnResult<Vec<Recipe>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;

        Ok(inner.values().cloned().collect())
    }

    fn get(&self, name: &str) -> KilnResult<Recipe> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;

        inner.get(name).cloned().ok_or_else(|| {
            ApplicationError::RecipeNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    fn insert(&self, recipe: Recipe) -> KilnResult<()> {
        validator::validate_recipe(&recipe).map_err(KilnError::Domain)?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        inner.insert(recipe.name.clone(), recipe);
        Ok(())
    }
}
