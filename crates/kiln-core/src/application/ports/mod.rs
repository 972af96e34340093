//! Application ports (traits) for external dependencies.
//!
//! Ports define what the runner needs from the outside world. Adapters in
//! `kiln-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: workspace and template-source file operations
//!   - `ToolRunner`: external process execution
//!   - `RecipeCatalog`: recipe storage/retrieval
//!   - `ProgressSink`: live step progress for the operator

pub mod output;

pub use output::{
    Filesystem, NoProgress, ProgressSink, RecipeCatalog, ToolCommand, ToolOutcome, ToolRunner,
};
