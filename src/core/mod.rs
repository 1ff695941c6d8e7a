mod engine;
mod error;
mod scenario;
mod types;
mod validation;

pub use engine::calculate_retirement;
pub use error::{ProjectionError, ProjectionResult};
pub use scenario::{Scenario, ScenarioOutcome, ScenarioSummary, compare_scenarios};
pub use types::{
    AccountEvent, AccountInput, AssumptionsInput, ContributionFrequency, ContributionGrowth,
    ContributionSchedule, FixedBenefit, HORIZON_YEARS, RetirementResult, RetirementTrigger,
    YearProjection,
};
pub use validation::{MAX_CURRENT_AGE, validate_accounts, validate_assumptions, validate_start_year};
