//! Flags accepted by every `kiln` subcommand.
//!
//! Flattened into [`super::Cli`] with `global = true`, so `kiln run -v` and
//! `kiln -v run` mean the same thing.

use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum, builder::FalseyValueParser};

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Log more. Repeat for more detail (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        long_help = "Log more while running:
    (none)  - warnings and errors only
    -v      - each step as it starts and finishes
    -vv     - resolved commands, files and env vars
    -vvv    - everything"
    )]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print without ANSI colours. Also set by `NO_COLOR` unless it is
    /// empty, `0`, `false`, `no` or `off`.
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Read settings from FILE instead of the per-user config file.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shape of command output on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub output_format: OutputFormat,

    /// Shape of log events on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Coloured when stdout is a terminal.
    #[default]
    Auto,
    Human,
    /// No colours, no decorations.
    Plain,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}
