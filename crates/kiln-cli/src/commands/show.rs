//! Implementation of the `kiln show` command.

use serde::Serialize;

use kiln_adapters::{LocalFilesystem, ProcessToolRunner};
use kiln_core::application::{PlanDisposition, PlannedStep, RecipeRunner, RunConfig};

use crate::{
    cli::{ShowArgs, ShowFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// App name used to render paths and commands when no app is given.
const PLACEHOLDER_APP: &str = "app";

#[derive(Serialize)]
struct ShownRecipe<'a> {
    name: &'a str,
    version: &'a str,
    description: &'a str,
    steps: Vec<ShownStep<'a>>,
    farewell: &'a [String],
}

#[derive(Serialize)]
struct ShownStep<'a> {
    #[serde(flatten)]
    planned: &'a PlannedStep,
    when: Option<String>,
}

pub fn execute(args: ShowArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let recipe = super::recipe_service(&config)?.get(&args.recipe)?;

    let mut builder = RunConfig::builder(PLACEHOLDER_APP)
        .allow_destructive(true)
        .environment_variable(&config.defaults.environment_variable)
        .generator(&config.defaults.generator);
    if let Some(version) = &args.framework_version {
        builder = builder.framework_version_str(version)?;
    }
    let runner = RecipeRunner::new(
        Box::new(LocalFilesystem::new()),
        Box::new(ProcessToolRunner::new()),
        builder.build()?,
    );
    let plan = runner.plan(&recipe);

    let guards: Vec<Option<String>> = recipe
        .steps
        .iter()
        .map(|s| s.guard.as_ref().map(ToString::to_string))
        .collect();

    match args.format {
        ShowFormat::Json => {
            let shown = ShownRecipe {
                name: &recipe.name,
                version: &recipe.version,
                description: &recipe.description,
                steps: plan
                    .iter()
                    .zip(guards)
                    .map(|(planned, when)| ShownStep { planned, when })
                    .collect(),
                farewell: &recipe.farewell,
            };
            output.json(&shown)?;
        }
        ShowFormat::Table => {
            output.header(&format!("{} ({} steps)", recipe.id(), plan.len()))?;
            if !recipe.description.is_empty() {
                output.print(&recipe.description)?;
            }
            for (step, when) in plan.iter().zip(guards) {
                let mut line = format!(
                    "  {:>3}. {} [{}] {}",
                    step.number, step.label, step.kind, step.summary
                );
                if let Some(req) = when {
                    line.push_str(&format!("  (when {req})"));
                }
                if step.destructive {
                    line.push_str("  (destructive)");
                }
                if let PlanDisposition::Skip { reason } = &step.disposition {
                    if args.framework_version.is_some() {
                        line.push_str(&format!("  (skip: {reason})"));
                    }
                }
                output.print(&line)?;
            }
        }
    }

    Ok(())
}
