//! Filesystem-based recipe loader.
//!
//! Parses recipe TOML files into domain [`Recipe`] objects.
//!
//! # Directory layout expected
//!
//! ```text
//! recipes/
//! ├── api-starter.toml
//! └── team/
//!     └── internal-app.toml
//! ```
//!
//! # Recipe file format
//!
//! ```toml
//! [recipe]
//! name        = "api-starter"
//! version     = "1.0.0"                  # optional, defaults to 0.1.0
//! description = "JSON API with auth"     # optional
//! farewell    = ["cd {{APP_NAME}}"]      # optional
//!
//! [[steps]]
//! label   = "install gems"
//! kind    = "run"                        # run | generate | copy | copy-dir
//! program = "bundle"                     # | remove | patch | substitute
//! args    = ["install"]                  # | announce
//!
//! [[steps]]
//! label       = "test schema"
//! kind        = "run"
//! program     = "bin/rails"
//! args        = ["db:reset"]
//! environment = "test"
//! destructive = true
//! when        = ">=5.2, <6"               # optional framework guard
//!
//! [[steps]]
//! label    = "sidekiq route"
//! kind     = "patch"
//! file     = "config/routes.rb"          # or newest_in = "db/migrate"
//! anchor   = "routes.draw do\n"          # or dir = "db/migrate" + suffix = ".rb"
//! position = "after"
//! text     = "  mount Sidekiq::Web => '/sidekiq'\n"
//!
//! [[steps]]
//! label       = "pin sqlite"
//! kind        = "substitute"
//! file        = "Gemfile"
//! pattern     = "gem 'sqlite3'.*"
//! regex       = true
//! replacement = "gem 'sqlite3', '~> 1.3.0'"
//! all         = false
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use semver::VersionReq;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use kiln_core::domain::{
    DomainError, Environment, FileTarget, Insertion, Pattern, Position, Recipe, RelativePath,
    Step, StepAction, Substitution, ToolInvocation,
};

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised representation of a recipe file.
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeManifest {
    pub recipe: RecipeSection,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

/// `[recipe]` section.
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeSection {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub farewell: Vec<String>,
}

/// One `[[steps]]` entry.
#[derive(Debug, Deserialize, Clone)]
pub struct StepEntry {
    pub label: String,
    /// Framework version requirement, e.g. `">=5.2, <6"`.
    pub when: Option<String>,
    #[serde(flatten)]
    pub action: ActionEntry,
}

/// The action half of a step, selected by `kind`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActionEntry {
    Run {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        environment: Option<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
        expected_exit_codes: Option<Vec<i32>>,
        #[serde(default)]
        destructive: bool,
        #[serde(default)]
        shell: bool,
    },
    Generate {
        generator: String,
        #[serde(default)]
        args: Vec<String>,
        environment: Option<String>,
    },
    Copy {
        src: String,
        /// Defaults to `src`.
        dst: Option<String>,
        #[serde(default)]
        force: bool,
    },
    CopyDir {
        src: String,
        dst: Option<String>,
        #[serde(default)]
        force: bool,
    },
    Remove {
        path: String,
    },
    Patch {
        #[serde(flatten)]
        target: TargetEntry,
        anchor: String,
        #[serde(default)]
        regex: bool,
        #[serde(default = "default_position")]
        position: Position,
        text: String,
    },
    Substitute {
        #[serde(flatten)]
        target: TargetEntry,
        pattern: String,
        #[serde(default)]
        regex: bool,
        replacement: String,
        #[serde(default)]
        all: bool,
    },
    Announce {
        message: String,
    },
}

/// How a patch names its file. Exactly one form must be given.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetEntry {
    pub file: Option<String>,
    pub newest_in: Option<String>,
    pub dir: Option<String>,
    pub suffix: Option<String>,
}

fn default_position() -> Position {
    Position::After
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse one recipe from TOML text.
///
/// # Errors
///
/// Returns [`DomainError::InvalidRecipe`] for malformed TOML or unknown
/// values, and the recipe's own validation errors otherwise.
pub fn parse_recipe(raw: &str) -> Result<Recipe, DomainError> {
    let manifest: RecipeManifest = toml::from_str(raw)
        .map_err(|e| DomainError::InvalidRecipe(format!("failed to parse recipe: {e}")))?;
    manifest.into_recipe()
}

impl RecipeManifest {
    pub fn into_recipe(self) -> Result<Recipe, DomainError> {
        let mut builder = Recipe::builder().name(self.recipe.name);
        if let Some(version) = self.recipe.version {
            builder = builder.version(version);
        }
        if let Some(description) = self.recipe.description {
            builder = builder.description(description);
        }
        for line in self.recipe.farewell {
            builder = builder.farewell(line);
        }
        for entry in self.steps {
            builder = builder.step(entry.into_step()?);
        }
        builder.build()
    }
}

impl StepEntry {
    fn into_step(self) -> Result<Step, DomainError> {
        let label = self.label;
        let action = self
            .action
            .into_action()
            .map_err(|e| match e {
                DomainError::InvalidRecipe(msg) => {
                    DomainError::InvalidRecipe(format!("step '{label}': {msg}"))
                }
                other => DomainError::InvalidRecipe(format!("step '{label}': {other}")),
            })?;

        let mut step = Step::new(label.clone(), action);
        if let Some(req) = self.when {
            let req = VersionReq::parse(&req).map_err(|e| DomainError::InvalidVersion {
                value: req.clone(),
                reason: format!("in step '{label}': {e}"),
            })?;
            step = step.when(req);
        }
        Ok(step)
    }
}

impl ActionEntry {
    fn into_action(self) -> Result<StepAction, DomainError> {
        Ok(match self {
            Self::Run {
                program,
                args,
                environment,
                env,
                expected_exit_codes,
                destructive,
                shell,
            } => {
                let mut tool = if shell {
                    ToolInvocation::shell(program)
                } else {
                    ToolInvocation::new(program)
                }
                .args(args);
                tool.environment = parse_environment(environment)?;
                tool.env = env;
                if let Some(codes) = expected_exit_codes {
                    tool = tool.expect_exit_codes(codes);
                }
                tool.destructive = destructive;
                StepAction::RunExternal(tool)
            }
            Self::Generate {
                generator,
                args,
                environment,
            } => StepAction::Generate {
                generator,
                args,
                environment: parse_environment(environment)?,
            },
            Self::Copy { src, dst, force } => {
                let dst = dst.unwrap_or_else(|| src.clone());
                StepAction::CopyFile {
                    src: RelativePath::try_new(src)?,
                    dst: RelativePath::try_new(dst)?,
                    force,
                }
            }
            Self::CopyDir { src, dst, force } => {
                let dst = dst.unwrap_or_else(|| src.clone());
                StepAction::CopyDirectory {
                    src: RelativePath::try_new(src)?,
                    dst: RelativePath::try_new(dst)?,
                    force,
                }
            }
            Self::Remove { path } => StepAction::RemoveFile {
                path: RelativePath::try_new(path)?,
            },
            Self::Patch {
                target,
                anchor,
                regex,
                position,
                text,
            } => StepAction::Patch {
                target: target.into_target()?,
                insertion: Insertion {
                    anchor: parse_pattern(&anchor, regex)?,
                    text,
                    position,
                },
            },
            Self::Substitute {
                target,
                pattern,
                regex,
                replacement,
                all,
            } => {
                let substitution = Substitution::new(parse_pattern(&pattern, regex)?, replacement);
                StepAction::Substitute {
                    target: target.into_target()?,
                    substitution: if all { substitution.all() } else { substitution },
                }
            }
            Self::Announce { message } => StepAction::Announce { message },
        })
    }
}

impl TargetEntry {
    fn into_target(self) -> Result<FileTarget, DomainError> {
        match (self.file, self.newest_in, self.dir, self.suffix) {
            (Some(file), None, None, None) => Ok(FileTarget::Path(RelativePath::try_new(file)?)),
            (None, Some(dir), None, None) => Ok(FileTarget::NewestIn {
                dir: RelativePath::try_new(dir)?,
            }),
            (None, None, Some(dir), Some(suffix)) => Ok(FileTarget::FirstMatching {
                dir: RelativePath::try_new(dir)?,
                suffix,
            }),
            _ => Err(DomainError::InvalidRecipe(
                "give exactly one of `file`, `newest_in`, or `dir` + `suffix`".into(),
            )),
        }
    }
}

fn parse_pattern(raw: &str, regex: bool) -> Result<Pattern, DomainError> {
    if regex {
        Pattern::regex(raw)
    } else {
        Ok(Pattern::literal(raw))
    }
}

fn parse_environment(raw: Option<String>) -> Result<Option<Environment>, DomainError> {
    raw.as_deref().map(Environment::from_str).transpose()
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads every `*.toml` recipe below a directory.
pub struct RecipeLoader {
    recipes_dir: PathBuf,
}

impl RecipeLoader {
    pub fn new(recipes_dir: impl Into<PathBuf>) -> Self {
        Self {
            recipes_dir: recipes_dir.into(),
        }
    }

    /// Load every valid recipe found under the directory.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRecipe`] if the directory does not
    /// exist or cannot be walked.
    ///
    /// Individual files that fail to parse or validate are **skipped with a
    /// `WARN` log** rather than failing the whole batch.
    #[instrument(skip(self), fields(dir = %self.recipes_dir.display()))]
    pub fn load_all(&self) -> Result<Vec<Recipe>, DomainError> {
        if !self.recipes_dir.is_dir() {
            return Err(DomainError::InvalidRecipe(format!(
                "recipes directory not found: {}",
                self.recipes_dir.display()
            )));
        }

        let mut recipes = Vec::new();
        for entry in WalkDir::new(&self.recipes_dir)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(|e| DomainError::InvalidRecipe(format!("directory walk error: {e}")))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }

            match load_file(path) {
                Ok(recipe) => {
                    debug!(id = %recipe.id(), "loaded recipe");
                    recipes.push(recipe);
                }
                Err(e) => {
                    warn!(
                        file  = %path.display(),
                        error = %e,
                        "skipping recipe file due to load error"
                    );
                }
            }
        }

        debug!(count = recipes.len(), "finished loading recipes");
        Ok(recipes)
    }
}

/// Load a single recipe file.
pub fn load_file(path: &Path) -> Result<Recipe, DomainError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        DomainError::InvalidRecipe(format!("failed to read '{}': {e}", path.display()))
    })?;
    parse_recipe(&raw).map_err(|e| match e {
        DomainError::InvalidRecipe(msg) => {
            DomainError::InvalidRecipe(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}
