//! Infrastructure adapters for Kiln.
//!
//! This crate implements the ports defined in `kiln-core::application::ports`.
//! It contains all external dependencies and I/O operations: the local
//! filesystem, child processes, git-cloned template sources, and recipe
//! files on disk.

pub mod builtin_recipes;
pub mod catalog;
pub mod filesystem;
pub mod framework;
pub mod recipe_loader;
pub mod template_source;
pub mod tools;

// Re-export commonly used adapters
pub use catalog::InMemoryCatalog;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use template_source::{ResolvedTemplateSource, TemplateSourceSpec};
pub use tools::{ProcessToolRunner, RecordingToolRunner};
