//! Application layer for Kiln.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (RecipeRunner, RecipeService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Config**: The immutable per-run `RunConfig`
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer. Text transforms,
//! validation and guards live in `crate::domain`; this layer decides when
//! they run and against which files.

pub mod config;
pub mod error;
pub mod ports;
pub mod services;

pub use config::{RunConfig, RunConfigBuilder, parse_lenient_version};

pub use services::{
    PlanDisposition, PlannedStep, RecipeRunner, RecipeService, RecipeSummary, RunReport, RunState,
    StepOutcome, StepStatus,
};

// Re-export port traits (for adapter implementation)
pub use ports::{
    Filesystem, NoProgress, ProgressSink, RecipeCatalog, ToolCommand, ToolOutcome, ToolRunner,
};

pub use error::ApplicationError;
