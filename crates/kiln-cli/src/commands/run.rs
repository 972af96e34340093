//! Implementation of the `kiln run` command.
//!
//! Responsibility: turn CLI arguments and config into a `RunConfig`, prepare
//! the template source, and hand the recipe to the core runner. No recipe
//! logic lives here.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{info, instrument, warn};

use kiln_adapters::{
    LocalFilesystem, ProcessToolRunner, ResolvedTemplateSource, TemplateSourceSpec, framework,
    recipe_loader,
};
use kiln_core::{
    application::{PlanDisposition, PlannedStep, RecipeRunner, RunConfig, parse_lenient_version},
    domain::{Recipe, StepKind},
};

use crate::{
    cli::{OutputFormat, RunArgs, global::GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::{OutputManager, RunProgress},
    signals::{self, TempRegistration},
};

/// Execute the `kiln run` command.
///
/// 1. Pick the recipe (file, `--recipe`, or `defaults.recipe`)
/// 2. Check the workspace and build the run configuration
/// 3. Print the plan and stop for `--dry-run`
/// 4. Confirm unless `--yes` or `--quiet`
/// 5. Resolve the template source (cloning it if remote)
/// 6. Run, then print the farewell
///
/// A cloned template source is dropped when this function returns, before
/// `main` turns the result into an exit code. An interrupt removes it from
/// the signal watcher instead.
#[instrument(skip_all, fields(app = %args.app_name))]
pub fn execute(
    args: RunArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let recipe = select_recipe(&args, &config)?;
    let workspace = resolve_workspace(args.workspace.as_deref())?;
    let framework_version = framework_version(&args, &workspace)?;

    let source = args
        .template_source
        .as_deref()
        .or(config.defaults.template_source.as_deref())
        .map(|s| TemplateSourceSpec::parse(s, args.branch.clone()));
    if source.is_none() && copies_templates(&recipe) {
        return Err(CliError::TemplateSourceRequired {
            recipe: recipe.name.clone(),
        });
    }

    if args.dry_run {
        let template_root = match &source {
            Some(TemplateSourceSpec::Local(path)) => path.clone(),
            _ => workspace.clone(),
        };
        let run_config = build_run_config(
            &args,
            &config,
            &workspace,
            &template_root,
            framework_version,
        )?;
        let runner = new_runner(run_config, &output);
        return print_plan(&recipe, &runner.plan(&recipe), &output);
    }

    if !global.quiet && !args.yes {
        show_summary(
            &recipe,
            &args,
            &workspace,
            source.as_ref(),
            framework_version.as_ref(),
            &output,
        )?;
        if !confirm()? {
            return Err(CliError::Cancelled);
        }
    }

    signals::init_signal_handlers()?;
    let checkout = Checkout::new(source.as_ref().map(TemplateSourceSpec::resolve).transpose()?);
    let template_root = checkout
        .root()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace.clone());

    let run_config = build_run_config(
        &args,
        &config,
        &workspace,
        &template_root,
        framework_version,
    )?;
    let mut runner = new_runner(run_config, &output);

    if output.format() != OutputFormat::Json {
        output.header(&format!(
            "Running '{}' in {}",
            recipe.id(),
            workspace.display()
        ))?;
    }
    info!(recipe = %recipe.id(), "Run started");

    let report = runner.run(&recipe)?;

    if output.format() == OutputFormat::Json {
        output.json(&report)?;
    } else {
        output.success(&format!(
            "{} steps applied, {} skipped",
            report.applied(),
            report.skipped()
        ))?;
        for line in &report.farewell {
            output.print(line)?;
        }
    }

    drop(checkout);
    Ok(())
}

/// A resolved template source, registered for cleanup on interrupt while
/// it is alive.
struct Checkout {
    // Dropped before the registration, so an interrupt never races the delete.
    source: Option<ResolvedTemplateSource>,
    _registration: Option<TempRegistration>,
}

impl Checkout {
    fn new(source: Option<ResolvedTemplateSource>) -> Self {
        let registration = source
            .as_ref()
            .and_then(ResolvedTemplateSource::temp_dir)
            .map(TempRegistration::new);
        Self {
            source,
            _registration: registration,
        }
    }

    fn root(&self) -> Option<&Path> {
        self.source.as_ref().map(ResolvedTemplateSource::root)
    }
}

fn select_recipe(args: &RunArgs, config: &AppConfig) -> CliResult<Recipe> {
    if let Some(path) = &args.recipe_file {
        return Ok(recipe_loader::load_file(path)?);
    }
    let name = args.recipe.as_deref().unwrap_or(&config.defaults.recipe);
    Ok(super::recipe_service(config)?.get(name)?)
}

fn resolve_workspace(dir: Option<&Path>) -> CliResult<PathBuf> {
    let dir = match dir {
        Some(dir) => std::path::absolute(dir)?,
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        return Err(CliError::WorkspaceMissing { path: dir });
    }
    Ok(dir)
}

fn copies_templates(recipe: &Recipe) -> bool {
    recipe
        .steps
        .iter()
        .any(|s| matches!(s.kind(), StepKind::CopyFile | StepKind::CopyDirectory))
}

/// `--framework-version` if given, else the version locked in the workspace.
fn framework_version(args: &RunArgs, workspace: &Path) -> CliResult<Option<Version>> {
    if let Some(raw) = &args.framework_version {
        return Ok(Some(parse_lenient_version(raw)?));
    }
    let detected = framework::detect_rails_version(workspace)?;
    if detected.is_none() {
        warn!("Framework version unknown; version-guarded steps will be skipped");
    }
    Ok(detected)
}

fn build_run_config(
    args: &RunArgs,
    config: &AppConfig,
    workspace: &Path,
    template_root: &Path,
    framework_version: Option<Version>,
) -> CliResult<RunConfig> {
    let mut builder = RunConfig::builder(&args.app_name)
        .workspace_root(workspace)
        .template_root(template_root)
        .allow_destructive(args.allow_destructive || config.safety.allow_destructive)
        .environment_variable(&config.defaults.environment_variable)
        .generator(&config.defaults.generator);
    if let Some(version) = framework_version {
        builder = builder.framework_version(version);
    }
    for (key, value) in &args.vars {
        builder = builder.variable(key, value);
    }
    Ok(builder.build()?)
}

fn new_runner(config: RunConfig, output: &OutputManager) -> RecipeRunner {
    let mut tools = ProcessToolRunner::new();
    if output.format() == OutputFormat::Json {
        tools = tools.stdout_to_stderr();
    }
    RecipeRunner::new(Box::new(LocalFilesystem::new()), Box::new(tools), config)
    .with_progress(Box::new(RunProgress::new(output.clone())))
}

fn print_plan(recipe: &Recipe, plan: &[PlannedStep], output: &OutputManager) -> CliResult<()> {
    if output.format() == OutputFormat::Json {
        return output.json(&plan);
    }

    output.info(&format!("Dry run: '{}' would run {} steps", recipe.id(), plan.len()))?;
    for step in plan {
        let line = format!("  {:>3}. {} [{}] {}", step.number, step.label, step.kind, step.summary);
        match &step.disposition {
            PlanDisposition::Run => output.print(&line)?,
            PlanDisposition::Skip { reason } => output.print(&format!("{line}  (skip: {reason})"))?,
            PlanDisposition::Refuse => output.warning(&format!(
                "{line}  (destructive: needs --allow-destructive)"
            ))?,
        }
    }
    Ok(())
}

fn show_summary(
    recipe: &Recipe,
    args: &RunArgs,
    workspace: &Path,
    source: Option<&TemplateSourceSpec>,
    framework_version: Option<&Version>,
    out: &OutputManager,
) -> CliResult<()> {
    out.header("Run")?;
    out.print(&format!("  Recipe:     {}", recipe.id()))?;
    out.print(&format!("  App:        {}", args.app_name))?;
    out.print(&format!("  Workspace:  {}", workspace.display()))?;
    if let Some(source) = source {
        out.print(&format!("  Templates:  {source}"))?;
    }
    if let Some(version) = framework_version {
        out.print(&format!("  Framework:  {version}"))?;
    }
    out.print(&format!("  Steps:      {}", recipe.step_count()))?;
    let destructive = recipe.destructive_steps().count();
    if destructive > 0 {
        out.warning(&format!(
            "{destructive} destructive step(s){}",
            if args.allow_destructive {
                " will run"
            } else {
                " will stop the run unless --allow-destructive is given"
            }
        ))?;
    }
    out.print("")?;
    Ok(())
}

#[cfg(feature = "interactive")]
fn confirm() -> CliResult<bool> {
    use dialoguer::{Confirm, theme::ColorfulTheme};

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Continue?")
        .default(true)
        .interact()
        .map_err(|e| CliError::IoError {
            message: "failed to read confirmation input".into(),
            source: std::io::Error::other(e),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm() -> CliResult<bool> {
    use std::io::{self, Write};

    print!("Continue? [Y/n] ");
    io::stdout().flush().map_err(|e| CliError::IoError {
        message: "failed to flush stdout".into(),
        source: e,
    })?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| CliError::IoError {
            message: "failed to read confirmation input".into(),
            source: e,
        })?;

    let input = input.trim().to_ascii_lowercase();
    Ok(input.is_empty() || input == "y" || input == "yes")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use kiln_adapters::builtin_recipes;
    use tempfile::TempDir;

    use crate::cli::{Cli, Commands};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["kiln", "run", "blog"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn missing_workspace_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_workspace(Some(&tmp.path().join("missing"))).unwrap_err();
        assert!(matches!(err, CliError::WorkspaceMissing { .. }));
        assert_eq!(resolve_workspace(Some(tmp.path())).unwrap(), tmp.path());
    }

    #[test]
    fn rails_starter_needs_templates() {
        let recipe = builtin_recipes::rails_starter().unwrap();
        assert!(copies_templates(&recipe));
    }

    #[test]
    fn run_config_merges_flags_and_config() {
        let tmp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.safety.allow_destructive = true;
        let args = run_args(&["--framework-version", "5.2", "--var", "COMPANY=Acme"]);

        let version = framework_version(&args, tmp.path()).unwrap();
        let run = build_run_config(&args, &config, tmp.path(), tmp.path(), version).unwrap();

        assert_eq!(run.app_name(), "blog");
        assert!(run.allow_destructive());
        assert_eq!(run.framework_version(), Some(&Version::new(5, 2, 0)));
        assert_eq!(run.render_context().get("COMPANY"), Some("Acme"));
    }

    #[test]
    fn bad_framework_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let args = run_args(&["--framework-version", "six"]);
        assert!(framework_version(&args, tmp.path()).is_err());
    }

    #[test]
    fn framework_version_is_read_from_lockfile() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(framework_version(&run_args(&[]), tmp.path()).unwrap(), None);

        std::fs::write(
            tmp.path().join("Gemfile.lock"),
            "GEM\n  specs:\n    rails (5.2.4.3)\n      actionpack (= 5.2.4.3)\n",
        )
        .unwrap();
        assert_eq!(
            framework_version(&run_args(&[]), tmp.path()).unwrap(),
            Some(Version::new(5, 2, 4))
        );
        assert_eq!(
            framework_version(&run_args(&["--framework-version", "6.0"]), tmp.path()).unwrap(),
            Some(Version::new(6, 0, 0))
        );
    }

    #[test]
    fn recipe_file_wins_over_catalog() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("r.toml");
        std::fs::write(
            &file,
            "[recipe]\nname = \"tiny\"\n\n[[steps]]\nlabel = \"hi\"\nkind = \"announce\"\nmessage = \"hi\"\n",
        )
        .unwrap();
        let args = run_args(&["--recipe-file", file.to_str().unwrap()]);
        assert_eq!(select_recipe(&args, &AppConfig::default()).unwrap().name, "tiny");
    }
}
