//! # Kiln CLI
//!
//! Runs scaffolding recipes against a freshly generated project.
//!
//! Startup reads `.env`, parses flags, installs logging, then layers the
//! config file and `KILN_*` variables over built-in defaults before
//! dispatching. Every failure becomes a [`CliError`] with its own exit code.
//!
//! ## Exit codes
//!
//! | Code   | Meaning                                   |
//! |--------|-------------------------------------------|
//! |  0     | Success                                   |
//! |  1     | Internal error or workspace mismatch      |
//! |  2     | User / input error                        |
//! |  3     | Resource not found                        |
//! |  4     | Configuration error                       |
//! |  127   | A tool could not be started               |
//! |  other | Exit status of the external tool that failed |

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;
mod signals;

fn main() -> ExitCode {
    // A .env file is optional.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here with use_stderr() == false.
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("kiln: {e:#}");
        return ExitCode::FAILURE;
    }

    let global = cli.global.clone();
    match start(cli) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, &global),
    }
}

fn start(cli: Cli) -> CliResult<()> {
    let config =
        AppConfig::load(cli.global.config.as_ref()).map_err(|e| CliError::ConfigError {
            message: format!("{e:#}"),
            source: None,
        })?;
    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        output_format = ?cli.global.output_format,
        "Configuration loaded"
    );

    let output = OutputManager::new(&cli.global, &config);
    dispatch(cli, config, output)
}

#[instrument(skip_all)]
fn dispatch(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.global, config, output),
        Commands::List(args) => commands::list::execute(args, config, output),
        Commands::Show(args) => commands::show::execute(args, config, output),
        Commands::Init(args) => commands::init::execute(args, output),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Config(command) => commands::config::execute(command, config, output),
    }
}

/// Translate a `CliError` into a user message and an exit code.
fn handle_error(err: CliError, global: &cli::GlobalArgs) -> ExitCode {
    err.log();

    // stderr, so the message survives a redirected stdout.
    let verbose = global.verbose > 0;
    let colored = !global.no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());
    let msg = if colored {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}
