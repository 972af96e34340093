//! Process-spawning tool runner.

use std::process::{Command, Stdio};

use kiln_core::{
    application::{
        ApplicationError,
        ports::{ToolCommand, ToolOutcome, ToolRunner},
    },
    error::KilnResult,
};
use tracing::{debug, instrument};

/// Runs tools as child processes of `kiln`.
///
/// Stdio is inherited, so generator and package-manager output reaches the
/// operator verbatim and interactive prompts still work.
#[derive(Debug, Clone)]
pub struct ProcessToolRunner {
    shell: String,
    stdout_to_stderr: bool,
}

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Use a different POSIX shell for `shell` invocations.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            stdout_to_stderr: false,
        }
    }

    /// Send tool stdout to our stderr, keeping stdout for a report.
    pub fn stdout_to_stderr(mut self) -> Self {
        self.stdout_to_stderr = true;
        self
    }

    fn stdout(&self) -> Stdio {
        if self.stdout_to_stderr {
            Stdio::from(std::io::stderr())
        } else {
            Stdio::inherit()
        }
    }

    fn build(&self, command: &ToolCommand) -> Command {
        let mut cmd = if command.shell {
            let mut cmd = Command::new(&self.shell);
            cmd.arg("-c").arg(&command.program);
            cmd
        } else {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args);
            cmd
        };
        cmd.current_dir(&command.cwd)
            .envs(&command.env)
            .stdin(Stdio::inherit())
            .stdout(self.stdout())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Default for ProcessToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for ProcessToolRunner {
    #[instrument(skip_all, fields(program = %command.program))]
    fn run(&self, command: &ToolCommand) -> KilnResult<ToolOutcome> {
        debug!(cwd = %command.cwd.display(), "Spawning");

        let status = self
            .build(command)
            .status()
            .map_err(|e| ApplicationError::ToolSpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        debug!(code = ?status.code(), "Tool exited");
        Ok(ToolOutcome {
            code: status.code(),
        })
    }
}
