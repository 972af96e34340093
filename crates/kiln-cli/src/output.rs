//! What `kiln` writes to stdout.
//!
//! Logs go to stderr through tracing; everything here is meant for the
//! operator or for a pipe.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use tracing::info;

use kiln_core::application::{ProgressSink, StepStatus};
use kiln_core::domain::Step;

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

#[derive(Clone)]
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let resolved_format = match args.output_format {
            OutputFormat::Auto if io::stdout().is_terminal() => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Plain,
            chosen => chosen,
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
        }
    }

    /// Plain line, dropped in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        self.line(msg.to_owned())
    }

    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.marked('\u{2713}', msg, Style::new().green())
    }

    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.marked('!', msg, Style::new().yellow())
    }

    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.marked('\u{2139}', msg, Style::new().blue())
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        self.line(self.styled(text, Style::new().cyan().bold()))
    }

    /// Pretty JSON on stdout. Written even in quiet mode so pipes always
    /// get a parseable document.
    pub fn json<T: Serialize>(&self, value: &T) -> CliResult<()> {
        let rendered = serde_json::to_string_pretty(value).map_err(|e| CliError::IoError {
            message: format!("Failed to serialise output: {e}"),
            source: io::Error::other(e),
        })?;
        self.term.write_line(&rendered)?;
        Ok(())
    }

    /// Whether ANSI colours are written.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// The format after `auto` was resolved.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }

    fn marked(&self, mark: char, msg: &str, style: Style) -> io::Result<()> {
        let mark = self.styled(&mark.to_string(), style.bold());
        self.line(format!("{mark} {}", self.styled(msg, style)))
    }

    fn styled(&self, text: &str, style: Style) -> String {
        if self.no_color {
            text.to_owned()
        } else {
            text.style(style).to_string()
        }
    }

    fn line(&self, text: String) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&text)
    }
}

/// Live step progress for `kiln run`.
///
/// Write errors are ignored; losing a progress line must not fail a run.
/// With JSON output stdout carries only the final report, so progress is
/// dropped and announcements go to the log.
pub struct RunProgress {
    output: OutputManager,
    silent: bool,
}

impl RunProgress {
    pub fn new(output: OutputManager) -> Self {
        let silent = output.format() == OutputFormat::Json;
        Self { output, silent }
    }
}

impl ProgressSink for RunProgress {
    fn step_started(&self, number: usize, total: usize, step: &Step) {
        if self.silent {
            return;
        }
        let line = format!("[{number}/{total}] {} ({})", step.label, step.kind());
        let _ = self.output.line(self.output.styled(&line, Style::new().bold()));
    }

    fn step_finished(&self, _number: usize, _step: &Step, status: &StepStatus) {
        if self.silent {
            return;
        }
        if let StepStatus::Skipped { reason } = status {
            let _ = self.output.info(&format!("skipped: {reason}"));
        }
    }

    fn announce(&self, message: &str) {
        if self.silent {
            info!(message, "Announcement");
            return;
        }
        let _ = self.output.print(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LogFormat;

    fn manager(quiet: bool, no_color: bool, format: OutputFormat) -> OutputManager {
        let args = GlobalArgs {
            verbose: 0,
            quiet,
            no_color,
            config: None,
            output_format: format,
            log_format: LogFormat::Text,
        };
        OutputManager::new(&args, &AppConfig::default())
    }

    #[test]
    fn quiet_drops_lines_without_error() {
        let out = manager(true, true, OutputFormat::Plain);
        assert!(out.is_quiet());
        assert!(out.print("hello").is_ok());
        assert!(out.success("done").is_ok());
    }

    #[test]
    fn styling_is_skipped_without_colour() {
        let plain = manager(false, true, OutputFormat::Human);
        assert_eq!(plain.styled("kiln", Style::new().red()), "kiln");

        let colored = manager(false, false, OutputFormat::Human);
        assert!(colored.styled("kiln", Style::new().red()).contains("\u{1b}["));
    }

    #[test]
    fn colour_only_in_human_format() {
        assert!(manager(false, false, OutputFormat::Human).supports_color());
        assert!(!manager(false, true, OutputFormat::Human).supports_color());
        assert!(!manager(false, false, OutputFormat::Plain).supports_color());
    }

    #[test]
    fn run_progress_is_silent_for_json() {
        assert!(RunProgress::new(manager(false, true, OutputFormat::Json)).silent);
        assert!(!RunProgress::new(manager(false, true, OutputFormat::Plain)).silent);

        let progress = RunProgress::new(manager(false, true, OutputFormat::Json));
        let step = Step::new(
            "hello",
            kiln_core::domain::StepAction::Announce {
                message: "hi".into(),
            },
        );
        progress.step_started(1, 1, &step);
        progress.announce("hi");
    }

    #[test]
    fn explicit_format_is_kept() {
        let out = manager(false, false, OutputFormat::Json);
        assert_eq!(out.format(), OutputFormat::Json);
    }
}
