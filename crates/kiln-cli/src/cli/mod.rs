//! Command-line surface of `kiln`, declared with clap's derive API.
//!
//! Handlers in [`crate::commands`] receive these structs already validated.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, LogFormat, OutputFormat};

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "kiln",
    bin_name = "kiln",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{1f525} Recipe-driven project scaffolding",
    long_about = "Kiln runs a recipe of scaffolding steps (generators, template \
                  copies, file patches) against a freshly generated project.",
    after_help = "EXAMPLES:\n\
        \x20 kiln run blog --workspace ./blog --template-source ./templates\n\
        \x20 kiln run blog --template-source https://github.com/acme/starter.git --allow-destructive\n\
        \x20 kiln list\n\
        \x20 kiln completions bash > /usr/share/bash-completion/completions/kiln",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a recipe against a workspace.
    #[command(
        visible_alias = "r",
        about = "Run a recipe",
        after_help = "EXAMPLES:\n\
            \x20 kiln run blog --workspace ./blog --template-source ./templates\n\
            \x20 kiln run blog --recipe-file ./my-recipe.toml --dry-run\n\
            \x20 kiln run blog --framework-version 5.2.3 --var COMPANY=Acme"
    )]
    Run(RunArgs),

    /// List available recipes.
    #[command(
        visible_alias = "ls",
        about = "List available recipes",
        after_help = "EXAMPLES:\n\
            \x20 kiln list\n\
            \x20 kiln list --format json"
    )]
    List(ListArgs),

    /// Show the steps of a recipe.
    #[command(
        about = "Show a recipe's steps",
        after_help = "EXAMPLES:\n\
            \x20 kiln show rails-starter\n\
            \x20 kiln show rails-starter --framework-version 6.0.0 --format json"
    )]
    Show(ShowArgs),

    /// Initialise a Kiln configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 kiln init\n\
            \x20 kiln init --force"
    )]
    Init(InitArgs),

    /// Print a completion script for your shell.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 kiln completions bash > ~/.local/share/bash-completion/completions/kiln\n\
            \x20 kiln completions zsh  > ~/.zfunc/_kiln\n\
            \x20 kiln completions fish > ~/.config/fish/completions/kiln.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Kiln configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 kiln config get defaults.recipe\n\
            \x20 kiln config list\n\
            \x20 kiln config path"
    )]
    Config(ConfigCommands),
}

/// Arguments for `kiln run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Application name, available to recipes as `{{APP_NAME}}`.
    #[arg(value_name = "APP_NAME", help = "Application name")]
    pub app_name: String,

    /// Built-in or configured recipe to run.
    #[arg(
        short = 'r',
        long = "recipe",
        value_name = "NAME",
        conflicts_with = "recipe_file",
        help = "Recipe name (default: defaults.recipe)"
    )]
    pub recipe: Option<String>,

    /// Recipe TOML file to run instead of a catalog recipe.
    #[arg(
        short = 'f',
        long = "recipe-file",
        value_name = "FILE",
        help = "Recipe file to run"
    )]
    pub recipe_file: Option<PathBuf>,

    /// Project directory the recipe modifies.
    #[arg(
        short = 'w',
        long = "workspace",
        value_name = "DIR",
        help = "Workspace directory (default: current directory)"
    )]
    pub workspace: Option<PathBuf>,

    /// Directory or git URL holding template files.
    #[arg(
        short = 't',
        long = "template-source",
        value_name = "PATH|URL",
        help = "Template source directory or git repository"
    )]
    pub template_source: Option<String>,

    /// Branch to clone when the template source is a git repository.
    #[arg(
        long = "branch",
        value_name = "BRANCH",
        requires = "template_source",
        help = "Template repository branch"
    )]
    pub branch: Option<String>,

    /// Framework version, used to pick version-specific steps.
    #[arg(
        long = "framework-version",
        value_name = "X.Y.Z",
        help = "Framework version (e.g. 6.0.0, 5.2)"
    )]
    pub framework_version: Option<String>,

    /// Run steps marked destructive (e.g. database resets).
    #[arg(long = "allow-destructive", help = "Allow destructive steps")]
    pub allow_destructive: bool,

    /// Extra template variables.
    #[arg(
        long = "var",
        value_name = "KEY=VALUE",
        value_parser = parse_key_val,
        help = "Template variable (repeatable)"
    )]
    pub vars: Vec<(String, String)>,

    /// Print the plan without changing anything.
    #[arg(long = "dry-run", help = "Show what would run without running it")]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", help = "Skip confirmation and run immediately")]
    pub yes: bool,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Arguments for `kiln list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
}

/// Arguments for `kiln show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Recipe name.
    #[arg(value_name = "RECIPE", help = "Recipe name")]
    pub recipe: String,

    /// Evaluate version guards against this framework version.
    #[arg(
        long = "framework-version",
        value_name = "X.Y.Z",
        help = "Framework version used to evaluate guards"
    )]
    pub framework_version: Option<String>,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ShowFormat,
}

/// Output format for the `show` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShowFormat {
    Table,
    Json,
}

/// Arguments for `kiln init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

/// Arguments for `kiln completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Subcommands for `kiln config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `defaults.recipe`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the default configuration file.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_run_command() {
        let cli = Cli::parse_from([
            "kiln",
            "run",
            "blog",
            "--workspace",
            "./blog",
            "--template-source",
            "https://github.com/acme/starter.git",
            "--branch",
            "main",
            "--framework-version",
            "6.0.0",
            "--var",
            "COMPANY=Acme",
            "--allow-destructive",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(args.app_name, "blog");
        assert_eq!(args.branch.as_deref(), Some("main"));
        assert_eq!(args.vars, [("COMPANY".to_string(), "Acme".to_string())]);
        assert!(args.allow_destructive);
        assert!(!args.dry_run);
    }

    #[test]
    fn recipe_and_recipe_file_conflict() {
        let result = Cli::try_parse_from([
            "kiln",
            "run",
            "blog",
            "--recipe",
            "rails-starter",
            "--recipe-file",
            "x.toml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn branch_requires_template_source() {
        let result = Cli::try_parse_from(["kiln", "run", "blog", "--branch", "main"]);
        assert!(result.is_err());
    }

    #[test]
    fn var_needs_equals() {
        assert!(parse_key_val("COMPANY").is_err());
        assert!(parse_key_val("=x").is_err());
        assert_eq!(
            parse_key_val("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["kiln", "--quiet", "--verbose", "list"]);
        assert!(result.is_err());
    }
}
