// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Kiln.
//!
//! Pure recipe logic: steps, patterns, patches, and rendering. All I/O
//! (files, processes, template sources) is reached through ports defined in
//! the application layer.
//!
//! ## Rules
//!
//! - **No async**: domain logic is synchronous
//! - **No I/O**: patches transform strings, never files
//! - **Immutable entities**: recipes and steps are Clone + PartialEq
pub mod entities;
pub mod error;
pub mod value_objects;

mod validation;

pub use entities::{
    common::RelativePath,
    patch::{Insertion, Substitution},
    pattern::Pattern,
    recipe::{Recipe, RecipeBuilder},
    render::RenderContext,
    step::{FileTarget, Step, StepAction, StepKind, ToolInvocation},
};

pub use error::{DomainError, ErrorCategory};

pub use value_objects::{Environment, Occurrence, Position};

pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    // ========================================================================
    // Value Object Tests
    // ========================================================================

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(Environment::from_str("dev").unwrap(), Environment::Development);
        assert_eq!(Environment::from_str("TEST").unwrap(), Environment::Test);
        assert_eq!(Environment::from_str("prod").unwrap(), Environment::Production);
        assert!(matches!(
            Environment::from_str("staging"),
            Err(DomainError::InvalidEnvironment(_))
        ));
    }

    #[test]
    fn environment_display_round_trips() {
        for env in [Environment::Development, Environment::Test, Environment::Production] {
            assert_eq!(Environment::from_str(&env.to_string()).unwrap(), env);
        }
    }

    #[test]
    fn occurrence_defaults_to_first() {
        assert_eq!(Occurrence::default(), Occurrence::First);
    }

    // ========================================================================
    // Recipe-level checks
    // ========================================================================

    #[test]
    fn validator_accepts_well_formed_recipe() {
        let recipe = Recipe::builder()
            .name("mini")
            .step(Step::new(
                "route",
                StepAction::Patch {
                    target: FileTarget::path("config/routes.rb"),
                    insertion: Insertion::after(
                        Pattern::literal("routes.draw do\n"),
                        "  root to: 'home#index'\n",
                    ),
                },
            ))
            .build()
            .unwrap();

        assert!(DomainValidator::validate_recipe(&recipe).is_ok());
    }

    #[test]
    fn mismatch_errors_are_categorised() {
        let err = DomainError::AnchorNotFound {
            path: "Gemfile".into(),
            anchor: "\"x\"".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Mismatch);
        assert!(!err.suggestions().is_empty());
    }
}
