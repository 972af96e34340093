//! Command handlers, one module per subcommand.

pub mod completions;
pub mod config;
pub mod init;
pub mod list;
pub mod run;
pub mod show;

use tracing::debug;

use kiln_adapters::InMemoryCatalog;
use kiln_core::application::RecipeService;

use crate::{config::AppConfig, error::CliResult};

/// Built-in recipes plus any from the configured recipes directory.
pub(crate) fn recipe_service(config: &AppConfig) -> CliResult<RecipeService> {
    let catalog = InMemoryCatalog::with_builtin()?;
    if let Some(dir) = &config.recipes.dir {
        let loaded = catalog.load_dir(dir)?;
        debug!(dir = %dir.display(), loaded, "Loaded recipes directory");
    }
    Ok(RecipeService::new(Box::new(catalog)))
}
