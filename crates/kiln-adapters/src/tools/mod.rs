//! External tool adapters.

mod process;
mod recording;

pub use process::ProcessToolRunner;
pub use recording::{RecordingToolRunner, ToolHook};
