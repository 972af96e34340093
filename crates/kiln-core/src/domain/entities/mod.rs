pub mod common;
pub mod patch;
pub mod pattern;
pub mod recipe;
pub mod render;
pub mod step;

pub use crate::domain::DomainError;
pub use recipe::Recipe;
pub use step::Step;
