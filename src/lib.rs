pub mod api;
pub mod core;

pub use crate::core::{
    AccountInput, AssumptionsInput, ProjectionError, RetirementResult, calculate_retirement,
    compare_scenarios,
};
