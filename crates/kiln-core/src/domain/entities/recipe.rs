//! Recipe aggregate: an ordered, validated list of steps.

use std::collections::HashSet;

use crate::domain::{entities::step::Step, error::DomainError};

/// A named, ordered scaffolding recipe.
///
/// Immutable once built. The runner executes `steps` in order and, on
/// success, shows the rendered `farewell` lines to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub farewell: Vec<String>,
}

impl Recipe {
    pub fn builder() -> RecipeBuilder {
        RecipeBuilder::default()
    }

    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn destructive_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.is_destructive())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "name" });
        }
        if self.steps.is_empty() {
            return Err(DomainError::EmptyRecipe {
                name: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            step.validate().map_err(|e| match e {
                DomainError::MissingRequiredField { field } => DomainError::InvalidRecipe(
                    format!("step '{}' is missing '{field}'", step.label),
                ),
                other => other,
            })?;
            if !seen.insert(step.label.as_str()) {
                return Err(DomainError::DuplicateStep {
                    label: step.label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`Recipe`]; `build` validates.
#[derive(Debug, Default)]
pub struct RecipeBuilder {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    steps: Vec<Step>,
    farewell: Vec<String>,
}

impl RecipeBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn farewell(mut self, line: impl Into<String>) -> Self {
        self.farewell.push(line.into());
        self
    }

    pub fn build(self) -> Result<Recipe, DomainError> {
        let recipe = Recipe {
            name: self
                .name
                .ok_or(DomainError::MissingRequiredField { field: "name" })?,
            version: self.version.unwrap_or_else(|| "0.1.0".into()),
            description: self.description.unwrap_or_default(),
            steps: self.steps,
            farewell: self.farewell,
        };
        recipe.validate()?;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::step::{StepAction, ToolInvocation};

    fn announce(label: &str) -> Step {
        Step::new(
            label,
            StepAction::Announce {
                message: label.into(),
            },
        )
    }

    #[test]
    fn builder_success() {
        let recipe = Recipe::builder()
            .name("starter")
            .version("1.2.0")
            .step(announce("one"))
            .step(announce("two"))
            .farewell("done")
            .build()
            .unwrap();

        assert_eq!(recipe.id(), "starter@1.2.0");
        assert_eq!(recipe.step_count(), 2);
        assert_eq!(recipe.steps[0].label, "one");
    }

    #[test]
    fn builder_requires_name() {
        assert!(matches!(
            Recipe::builder().step(announce("x")).build(),
            Err(DomainError::MissingRequiredField { field: "name" })
        ));
    }

    #[test]
    fn empty_recipe_rejected() {
        assert!(matches!(
            Recipe::builder().name("empty").build(),
            Err(DomainError::EmptyRecipe { .. })
        ));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let result = Recipe::builder()
            .name("dup")
            .step(announce("same"))
            .step(announce("same"))
            .build();
        assert!(matches!(result, Err(DomainError::DuplicateStep { .. })));
    }

    #[test]
    fn step_errors_name_the_step() {
        let result = Recipe::builder()
            .name("bad")
            .step(Step::new("empty tool", StepAction::RunExternal(ToolInvocation::new(""))))
            .build();
        match result {
            Err(DomainError::InvalidRecipe(msg)) => assert!(msg.contains("empty tool")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn destructive_steps_are_listed() {
        let recipe = Recipe::builder()
            .name("r")
            .step(announce("a"))
            .step(Step::new(
                "reset",
                StepAction::RunExternal(
                    ToolInvocation::new("bin/rails")
                        .arg("db:reset")
                        .destructive(),
                ),
            ))
            .build()
            .unwrap();
        let labels: Vec<_> = recipe.destructive_steps().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["reset"]);
    }
}
