//! Implementation of the `kiln list` command.

use crate::{
    cli::{ListArgs, ListFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let service = super::recipe_service(&config)?;
    let recipes = service.summaries()?;

    match args.format {
        ListFormat::Table => {
            output.header("Available Recipes:")?;
            for recipe in &recipes {
                let destructive = if recipe.destructive_steps > 0 {
                    format!(", {} destructive", recipe.destructive_steps)
                } else {
                    String::new()
                };
                output.print(&format!(
                    "  {} @ {} ({} steps{destructive})",
                    recipe.name, recipe.version, recipe.steps
                ))?;
                if !recipe.description.is_empty() {
                    output.print(&format!("      {}", recipe.description))?;
                }
            }
        }
        ListFormat::List => {
            for recipe in &recipes {
                output.print(&recipe.name)?;
            }
        }
        ListFormat::Json => output.json(&recipes)?,
    }

    Ok(())
}
