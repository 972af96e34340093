//! Errors surfaced by the `kiln` binary.
//!
//! Every error knows what the operator can do about it and which exit code
//! it maps to. A failed external tool hands its own exit status through.

use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use thiserror::Error;

use kiln_core::error::KilnError;

pub use kiln_core::error::ErrorCategory as CoreCategory;

pub type CliResult<T> = Result<T, CliError>;

/// Exit status for a tool that could not be started, as shells report it.
const SPAWN_FAILURE_EXIT: u8 = 127;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The workspace directory is unusable.
    #[error("Workspace not found: {path}")]
    WorkspaceMissing { path: PathBuf },

    /// A recipe copies template files but no template source was given.
    #[error("Recipe '{recipe}' copies template files but no template source is configured")]
    TemplateSourceRequired { recipe: String },

    /// A configuration file could not be read, parsed, or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error propagated from `kiln-core` or the adapters.
    #[error(transparent)]
    Core(#[from] KilnError),

    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The operator declined the confirmation prompt.
    #[error("Cancelled")]
    Cancelled,
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<kiln_core::domain::DomainError> for CliError {
    fn from(err: kiln_core::domain::DomainError) -> Self {
        CliError::Core(err.into())
    }
}

impl CliError {
    /// Things the operator can try next.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { .. } => vec!["See `kiln help run` for accepted values".into()],

            Self::WorkspaceMissing { path } => vec![
                format!("'{}' is not a directory", path.display()),
                "Generate the application first (e.g. `rails new <APP_NAME>`)".into(),
                "Point --workspace at the generated project".into(),
            ],

            Self::TemplateSourceRequired { .. } => vec![
                "Pass --template-source with a directory or git URL".into(),
                "Or set defaults.template_source in the config file".into(),
            ],

            Self::ConfigError { .. } => vec![
                "`kiln config path` prints the file being read".into(),
                "`kiln init --force` rewrites it with defaults".into(),
            ],

            Self::Core(core_err) => core_err.suggestions(),

            Self::IoError { .. } => vec!["Check permissions on the workspace".into()],

            Self::Cancelled => vec!["Nothing was changed".into()],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::Cancelled => ErrorCategory::UserError,
            Self::WorkspaceMissing { .. } => ErrorCategory::NotFound,
            Self::TemplateSourceRequired { .. } | Self::ConfigError { .. } => {
                ErrorCategory::Configuration
            }
            Self::Core(core) => match core.category() {
                CoreCategory::Validation => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Configuration => ErrorCategory::Configuration,
                CoreCategory::Tool => ErrorCategory::ToolFailure,
                CoreCategory::Mismatch | CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    /// Exit code to pass to the OS.
    ///
    /// | Category      | Code                         |
    /// |---------------|------------------------------|
    /// | Tool failure  | the tool's status (1..=255)  |
    /// | User error    |  2                           |
    /// | Not found     |  3                           |
    /// | Configuration |  4                           |
    /// | Internal      |  1                           |
    pub fn exit_code(&self) -> u8 {
        if let Some(code) = self.tool_exit_code() {
            return u8::try_from(code.clamp(1, 255)).unwrap_or(1);
        }
        match self.category() {
            ErrorCategory::ToolFailure => SPAWN_FAILURE_EXIT,
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
            ErrorCategory::Internal => 1,
        }
    }

    fn tool_exit_code(&self) -> Option<i32> {
        match self {
            Self::Core(core) => core.tool_exit_code(),
            _ => None,
        }
    }

    /// Coloured report for a terminal.
    pub fn format_colored(&self, verbose: bool) -> String {
        self.render(verbose, true)
    }

    /// Same report without ANSI codes.
    pub fn format_plain(&self, verbose: bool) -> String {
        self.render(verbose, false)
    }

    fn render(&self, verbose: bool, color: bool) -> String {
        let paint = |text: String, style: fn(&str) -> String| {
            if color { style(&text) } else { text }
        };
        let mut out = String::new();

        let _ = writeln!(
            out,
            "\n{}",
            paint(format!("Error: {self}"), |t| t.red().bold().to_string())
        );

        if verbose {
            for cause in self.causes() {
                let _ = writeln!(
                    out,
                    "  {}",
                    paint(format!("Caused by: {cause}"), |t| t.dimmed().to_string())
                );
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(
                out,
                "\n{}",
                paint("Suggestions:".into(), |t| t.yellow().bold().to_string())
            );
            for suggestion in &suggestions {
                let _ = writeln!(out, "  - {suggestion}");
            }
        }

        if !verbose {
            let _ = writeln!(
                out,
                "\n{}",
                paint(
                    "Run again with --verbose to see the cause chain.".into(),
                    |t| t.dimmed().to_string()
                )
            );
        }
        out
    }

    fn causes(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        std::iter::successors(self.source(), |&err| err.source())
    }

    /// Record the failure in the log before it is printed.
    pub fn log(&self) {
        let category = self.category();
        match category {
            ErrorCategory::UserError | ErrorCategory::NotFound => {
                tracing::warn!(?category, error = %self, "Command rejected");
            }
            _ => tracing::error!(?category, error = %self, "Command failed"),
        }
        for cause in self.causes() {
            tracing::debug!(%cause, "Caused by");
        }
    }
}

/// Coarse grouping that decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserError,
    NotFound,
    /// An external tool failed or could not start.
    ToolFailure,
    Configuration,
    /// Includes a workspace that does not look the way the recipe expects.
    Internal,
}
