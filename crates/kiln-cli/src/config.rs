//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only ever sees a `RunConfig`.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `KILN_<SECTION>__<KEY>`, e.g.
//!    `KILN_SAFETY__ALLOW_DESTRUCTIVE=true`
//! 3. Config file (`--config FILE`, else the platform config path)
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kiln_adapters::builtin_recipes::RAILS_STARTER;
use kiln_core::application::RunConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub defaults: Defaults,
    pub safety: SafetyConfig,
    pub output: OutputConfig,
    pub recipes: RecipesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Recipe `kiln run` uses without `--recipe`.
    pub recipe: String,
    pub template_source: Option<String>,
    /// Variable that carries a tool step's environment.
    pub environment_variable: String,
    /// Command prefix for generate steps.
    pub generator: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub allow_destructive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub no_color: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Extra directory of `*.toml` recipes, loaded over the built-ins.
    pub dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: Defaults {
                recipe: RAILS_STARTER.into(),
                template_source: None,
                environment_variable: RunConfig::DEFAULT_ENVIRONMENT_VARIABLE.into(),
                generator: vec!["bin/rails".into(), "generate".into()],
            },
            safety: SafetyConfig {
                allow_destructive: false,
            },
            output: OutputConfig { no_color: false },
            recipes: RecipesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, layering file and environment over defaults.
    ///
    /// An explicit `config_file` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (path.clone(), true),
            None => (Self::config_path(), false),
        };
        debug!(path = %path.display(), required, "Loading configuration");
        Self::load_from(&path, required, Self::environment())
    }

    fn load_from(path: &Path, required: bool, env: Environment) -> anyhow::Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to encode default configuration")?;

        Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn environment() -> Environment {
        Environment::with_prefix("KILN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(" ")
            .with_list_parse_key("defaults.generator")
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.kiln.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "kiln", "kiln")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".kiln.toml"))
    }

    /// Look up a dotted key for `kiln config get`.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "defaults.recipe" => self.defaults.recipe.clone(),
            "defaults.template_source" => self.defaults.template_source.clone().unwrap_or_default(),
            "defaults.environment_variable" => self.defaults.environment_variable.clone(),
            "defaults.generator" => self.defaults.generator.join(" "),
            "safety.allow_destructive" => self.safety.allow_destructive.to_string(),
            "output.no_color" => self.output.no_color.to_string(),
            "recipes.dir" => self
                .recipes
                .dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }
}
