//! Kiln Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Kiln, a
//! recipe runner that scaffolds projects by sequencing external
//! generators, template copies, and anchored text patches.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              kiln-cli (CLI)             │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Application Services           │
//! │     (RecipeRunner, RecipeService)       │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │       Application Ports (Traits)        │
//! │ (Filesystem, ToolRunner, RecipeCatalog) │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      kiln-adapters (Infrastructure)     │
//! │ (LocalFilesystem, ProcessToolRunner...) │
//! └─────────────────────────────────────────┘
//!
//!           Domain Layer (Pure Logic)
//!    (Recipe, Step, Pattern, Insertion, ...)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kiln_core::prelude::*;
//! # fn demo(filesystem: Box<dyn Filesystem>, tools: Box<dyn ToolRunner>, recipe: Recipe) -> KilnResult<()> {
//! let config = RunConfig::builder("shop")
//!     .workspace_root("./shop")
//!     .template_root("./templates")
//!     .build()?;
//!
//! let mut runner = RecipeRunner::new(filesystem, tools, config);
//! let report = runner.run(&recipe)?;
//! println!("{} steps applied", report.applied());
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        RecipeRunner, RecipeService, RunConfig, RunReport, StepStatus,
        ports::{Filesystem, RecipeCatalog, ToolCommand, ToolOutcome, ToolRunner},
    };
    pub use crate::domain::{
        Environment, FileTarget, Insertion, Occurrence, Pattern, Position, Recipe, RecipeBuilder,
        RelativePath, RenderContext, Step, StepAction, Substitution, ToolInvocation,
    };
    pub use crate::error::{KilnError, KilnResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
