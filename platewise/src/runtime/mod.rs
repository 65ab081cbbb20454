//! Mutation commands and their Redis execution.

pub mod commands;
pub mod executor;
pub mod scripts;

pub use commands::{MutationCommand, MutationOutcome, MutationPlan, ToggleAction};
pub use executor::execute_plan;
