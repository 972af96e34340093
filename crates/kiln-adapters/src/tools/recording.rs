//! Recording tool runner for tests and previews.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use kiln_core::{
    application::{
        ApplicationError,
        ports::{ToolCommand, ToolOutcome, ToolRunner},
    },
    error::KilnResult,
};

/// Side effect run when a tool is "executed", e.g. a fake generator that
/// writes the files the real one would.
pub type ToolHook = Arc<dyn Fn(&ToolCommand) -> KilnResult<()> + Send + Sync>;

/// Records every command instead of running it.
///
/// Exit codes default to `0` and can be scripted per program.
#[derive(Clone, Default)]
pub struct RecordingToolRunner {
    inner: Arc<RwLock<RecordingInner>>,
}

#[derive(Default)]
struct RecordingInner {
    calls: Vec<ToolCommand>,
    codes: HashMap<String, Option<i32>>,
    hooks: Vec<(String, ToolHook)>,
}

impl RecordingToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` exit with `code`.
    pub fn exit_with(self, program: impl Into<String>, code: i32) -> Self {
        self.script(program, Some(code))
    }

    /// Make `program` die as if killed by a signal.
    pub fn kill(self, program: impl Into<String>) -> Self {
        self.script(program, None)
    }

    /// Run `hook` whenever `program` is invoked.
    pub fn on(self, program: impl Into<String>, hook: ToolHook) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.hooks.push((program.into(), hook));
        }
        self
    }

    /// Commands seen so far, in order.
    pub fn calls(&self) -> Vec<ToolCommand> {
        self.inner
            .read()
            .map(|inner| inner.calls.clone())
            .unwrap_or_default()
    }

    /// Rendered command lines seen so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    fn script(self, program: impl Into<String>, code: Option<i32>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.codes.insert(program.into(), code);
        }
        self
    }
}

impl ToolRunner for RecordingToolRunner {
    fn run(&self, command: &ToolCommand) -> KilnResult<ToolOutcome> {
        let hooks: Vec<ToolHook> = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| ApplicationError::StoreLockError)?;
            inner.calls.push(command.clone());
            inner
                .hooks
                .iter()
                .filter(|(program, _)| *program == command.program)
                .map(|(_, hook)| Arc::clone(hook))
                .collect()
        };

        for hook in hooks {
            hook(command)?;
        }

        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(ToolOutcome {
            code: inner.codes.get(&command.program).copied().unwrap_or(Some(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cmd(program: &str) -> ToolCommand {
        ToolCommand {
            program: program.into(),
            args: vec!["install".into()],
            cwd: PathBuf::from("/ws"),
            env: BTreeMap::new(),
            shell: false,
        }
    }

    #[test]
    fn records_and_scripts_codes() {
        let tools = RecordingToolRunner::new().exit_with("yarn", 2).kill("bundle");

        assert_eq!(tools.run(&cmd("git")).unwrap(), ToolOutcome::exited(0));
        assert_eq!(tools.run(&cmd("yarn")).unwrap(), ToolOutcome::exited(2));
        assert_eq!(tools.run(&cmd("bundle")).unwrap(), ToolOutcome::signalled());
        assert_eq!(
            tools.command_lines(),
            ["git install", "yarn install", "bundle install"]
        );
    }

    #[test]
    fn hooks_fire_for_matching_program() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let tools = RecordingToolRunner::new().on(
            "bin/rails",
            Arc::new(move |_: &ToolCommand| -> KilnResult<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        tools.run(&cmd("bin/rails")).unwrap();
        tools.run(&cmd("git")).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
