//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `kiln-adapters` crate provides implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::application::services::StepStatus;
use crate::domain::{Recipe, Step};
use crate::error::KilnResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `kiln_adapters::filesystem::LocalFilesystem` (production)
/// - `kiln_adapters::filesystem::MemoryFilesystem` (testing)
///
/// Paths are absolute (already joined onto the workspace or template root).
/// Writes never create missing parent directories implicitly.
pub trait Filesystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> KilnResult<String>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()>;

    /// Copy a file byte-for-byte, replacing the destination if present.
    fn copy_file(&self, from: &Path, to: &Path) -> KilnResult<()>;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> KilnResult<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> KilnResult<()>;

    /// All regular files below `dir`, recursively, sorted by path.
    fn list_files(&self, dir: &Path) -> KilnResult<Vec<PathBuf>>;

    /// Last modification time.
    fn modified(&self, path: &Path) -> KilnResult<SystemTime>;
}

/// A fully resolved external command, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// Run `program` through `sh -c`.
    pub shell: bool,
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.env {
            write!(f, "{k}={v} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a tool finished. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    pub code: Option<i32>,
}

impl ToolOutcome {
    pub const fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub const fn signalled() -> Self {
        Self { code: None }
    }
}

/// Port for running external tools.
///
/// Implemented by:
/// - `kiln_adapters::tools::ProcessToolRunner` (inherits stdio)
/// - `kiln_adapters::tools::RecordingToolRunner` (testing)
///
/// Returns `Err` only when the tool could not be started; a non-zero exit
/// is a normal `ToolOutcome` and judged by the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner: Send + Sync {
    fn run(&self, command: &ToolCommand) -> KilnResult<ToolOutcome>;
}

/// Port for recipe storage and retrieval.
///
/// Implemented by:
/// - `kiln_adapters::catalog::InMemoryCatalog` (built-ins + loaded files)
pub trait RecipeCatalog: Send + Sync {
    /// List all available recipes, sorted by name.
    fn list(&self) -> KilnResult<Vec<Recipe>>;

    /// Get a recipe by name.
    fn get(&self, name: &str) -> KilnResult<Recipe>;

    /// Insert or replace a recipe.
    fn insert(&self, recipe: Recipe) -> KilnResult<()>;
}

/// Port for live progress reporting while a recipe runs.
pub trait ProgressSink {
    fn step_started(&self, _number: usize, _total: usize, _step: &Step) {}

    fn step_finished(&self, _number: usize, _step: &Step, _status: &StepStatus) {}

    /// A recipe `Announce` step, already rendered.
    fn announce(&self, _message: &str) {}
}

/// Progress sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}
