//! The one error type `kiln-core` returns.
//!
//! Domain and application errors are folded into [`KilnError`] with `?`.
//! Callers ask it for a category, next-step suggestions, and the exit status
//! of a failed tool.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

#[derive(Debug, Error, Clone)]
pub enum KilnError {
    /// Malformed recipe, or a file that does not match a patch.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Something went wrong while running steps.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KilnError {
    /// Hints for the operator, most specific first.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { .. } => vec!["Review the run settings".into()],
            Self::Internal { .. } => vec![
                "This is a bug in kiln; please open an issue with the -vv output".into(),
            ],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Mismatch => ErrorCategory::Mismatch,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Exit status of the external tool behind this error, if any.
    ///
    /// Looks through step wrappers. A tool killed by a signal reports `1`.
    pub fn tool_exit_code(&self) -> Option<i32> {
        match self {
            Self::Application(ApplicationError::ToolFailed { code, .. }) => {
                Some(code.unwrap_or(1))
            }
            Self::Application(ApplicationError::StepFailed { source, .. }) => {
                source.tool_exit_code()
            }
            _ => None,
        }
    }

    /// Label of the step that failed, if the error came out of a run.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::Application(ApplicationError::StepFailed { step, .. }) => Some(step),
            _ => None,
        }
    }
}

/// Decides presentation and exit code at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Mismatch,
    NotFound,
    Tool,
    Configuration,
    Internal,
}

pub type KilnResult<T> = Result<T, KilnError>;
