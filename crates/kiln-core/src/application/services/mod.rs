//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "run a recipe" or "look up a recipe".

pub mod recipe_runner;
pub mod recipe_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use recipe_runner::{
    PlanDisposition, PlannedStep, RecipeRunner, RunReport, RunState, StepOutcome, StepStatus,
};
pub use recipe_service::{RecipeService, RecipeSummary};
