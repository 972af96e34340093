//! Application layer errors.
//!
//! These errors represent failures while executing a recipe against real
//! collaborators (files, processes, catalogs). Recipe-definition and
//! patch-mismatch errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ErrorCategory, KilnError};

/// Errors that occur during recipe execution.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A step failed; wraps the underlying cause.
    #[error("Step {number} '{step}' failed: {source}")]
    StepFailed {
        /// 1-based position in the recipe.
        number: usize,
        step: String,
        #[source]
        source: Box<KilnError>,
    },

    /// An external tool exited with an unexpected status.
    #[error("`{command}` exited with {}", describe_code(.code))]
    ToolFailed { command: String, code: Option<i32> },

    /// An external tool could not be started at all.
    #[error("Could not start `{command}`: {reason}")]
    ToolSpawnFailed { command: String, reason: String },

    /// A destructive step was reached without opt-in.
    #[error("Refusing to run destructive step '{step}' without --allow-destructive")]
    DestructiveStepRefused { step: String },

    /// Non-forced copy onto an existing file.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Template source file or directory is missing.
    #[error("Template source not found: {path}")]
    SourceMissing { path: PathBuf },

    /// A patch target did not resolve to a file.
    #[error("No file matches {target}")]
    TargetNotFound { target: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Template source could not be prepared (clone failed, not a dir).
    #[error("Template source unavailable: {reason}")]
    TemplateSourceUnavailable { reason: String },

    /// Recipe lookup failed.
    #[error("Recipe not found: {name}")]
    RecipeNotFound { name: String },

    /// A runner was asked to run twice.
    #[error("Recipe runner has already been used; create a new runner")]
    RunnerConsumed,

    /// Store access failed (lock poisoned).
    #[error("Recipe catalog error")]
    StoreLockError,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::StepFailed { step, source, .. } => {
                let mut out = vec![format!("The recipe stopped at step '{step}'")];
                out.extend(source.suggestions());
                out.push(
                    "Steps before it were applied; the workspace is partially scaffolded".into(),
                );
                out
            }
            Self::ToolFailed { command, .. } => vec![
                format!("External command failed: {command}"),
                "Check the command output above for details".into(),
            ],
            Self::ToolSpawnFailed { command, .. } => vec![
                format!("Ensure `{command}` is installed and in your PATH"),
            ],
            Self::DestructiveStepRefused { .. } => vec![
                "This step destroys data (e.g. resets the database)".into(),
                "Re-run with --allow-destructive if that is intended".into(),
            ],
            Self::DestinationExists { path } => vec![
                format!("{} already exists in the workspace", path.display()),
                "Mark the copy step with force = true to overwrite".into(),
            ],
            Self::SourceMissing { path } => vec![
                format!("{} is not present in the template source", path.display()),
                "Check --template-source points at the right directory or repository".into(),
            ],
            Self::TargetNotFound { .. } => vec![
                "The file a patch step targets was never generated".into(),
                "An earlier generator step may have been skipped or failed".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::TemplateSourceUnavailable { .. } => vec![
                "Check the template source path or URL".into(),
                "Remote sources need git and network access".into(),
            ],
            Self::RecipeNotFound { .. } => vec!["Try: kiln list to see available recipes".into()],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StepFailed { source, .. } => source.category(),
            Self::ToolFailed { .. } | Self::ToolSpawnFailed { .. } => ErrorCategory::Tool,
            Self::DestructiveStepRefused { .. } | Self::DestinationExists { .. } => {
                ErrorCategory::Validation
            }
            Self::SourceMissing { .. }
            | Self::TargetNotFound { .. }
            | Self::RecipeNotFound { .. } => ErrorCategory::NotFound,
            Self::TemplateSourceUnavailable { .. } => ErrorCategory::Configuration,
            Self::FilesystemError { .. } | Self::RunnerConsumed | Self::StoreLockError => {
                ErrorCategory::Internal
            }
        }
    }
}
