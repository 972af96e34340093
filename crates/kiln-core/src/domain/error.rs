// ============================================================================
// domain/error.rs - RECIPE DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (carried inside step failure reports)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Recipe definition errors
    // ========================================================================
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("Recipe '{name}' has no steps")]
    EmptyRecipe { name: String },

    #[error("Duplicate step label in recipe: {label}")]
    DuplicateStep { label: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the workspace root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unknown environment '{0}'")]
    InvalidEnvironment(String),

    #[error("Invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },

    // ========================================================================
    // Apply-time mismatches
    // ========================================================================
    #[error("Anchor '{anchor}' not found in {path}")]
    AnchorNotFound { path: String, anchor: String },

    #[error("Pattern '{pattern}' not found in {path}")]
    PatternNotFound { path: String, pattern: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidRecipe(msg) => vec![
                "Check the recipe definition".into(),
                format!("Details: {msg}"),
            ],
            Self::EmptyRecipe { name } => vec![
                format!("Recipe '{name}' must declare at least one step"),
                "Add a [[steps]] table to the recipe file".into(),
            ],
            Self::DuplicateStep { label } => vec![
                format!("Step label '{label}' is used more than once"),
                "Give every step a unique label".into(),
            ],
            Self::AbsolutePathNotAllowed { .. } | Self::PathEscapesRoot { .. } => vec![
                "Recipe paths are relative to the workspace or template source".into(),
                "Remove leading '/' and any '..' components".into(),
            ],
            Self::InvalidPattern { reason, .. } => vec![
                format!("Regex error: {reason}"),
                "Use a literal pattern if no regex features are needed".into(),
            ],
            Self::InvalidEnvironment(_) => {
                vec!["Valid environments: development, test, production".into()]
            }
            Self::AnchorNotFound { path, .. } | Self::PatternNotFound { path, .. } => vec![
                format!("The generated file {path} does not look as the recipe expects"),
                "Check the framework version the recipe targets (--framework-version)".into(),
                "Earlier steps may have produced different output than expected".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRecipe(_)
            | Self::EmptyRecipe { .. }
            | Self::DuplicateStep { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::PathEscapesRoot { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidEnvironment(_)
            | Self::InvalidVersion { .. }
            | Self::MissingRequiredField { .. } => ErrorCategory::Validation,
            Self::AnchorNotFound { .. } | Self::PatternNotFound { .. } => ErrorCategory::Mismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Mismatch,
}
