//! What-if comparison of several assumption sets over one account list.
//!
//! Projections share nothing, so each scenario runs on the rayon pool and a
//! failing scenario leaves the others untouched.

use rayon::prelude::*;
use serde::Serialize;

use super::engine::calculate_retirement;
use super::error::ProjectionResult;
use super::types::{AccountInput, AssumptionsInput, RetirementResult, RetirementTrigger};

#[derive(Debug, Clone)]
pub struct Scenario {
    pub label: String,
    pub assumptions: AssumptionsInput,
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub label: String,
    pub result: ProjectionResult<RetirementResult>,
}

/// Headline numbers of one scenario, without the per-year rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub retirement_year: i32,
    pub retirement_age: u32,
    pub retirement_trigger: RetirementTrigger,
    pub years_until_retirement: u32,
    pub portfolio_at_retirement: f64,
    pub annual_income_at_retirement: f64,
    pub target_spending_at_retirement: f64,
}

impl ScenarioSummary {
    pub fn from_result(result: &RetirementResult) -> Self {
        Self {
            retirement_year: result.retirement_year,
            retirement_age: result.retirement_age,
            retirement_trigger: result.retirement_trigger,
            years_until_retirement: result.years_until_retirement(),
            portfolio_at_retirement: result.portfolio_at_retirement,
            annual_income_at_retirement: result.annual_income_at_retirement,
            target_spending_at_retirement: result.target_spending_at_retirement,
        }
    }
}

impl ScenarioOutcome {
    pub fn summary(&self) -> Option<ScenarioSummary> {
        self.result
            .as_ref()
            .ok()
            .map(ScenarioSummary::from_result)
    }
}

/// Projects every scenario against the same accounts, in input order.
pub fn compare_scenarios(
    scenarios: &[Scenario],
    accounts: &[AccountInput],
    start_year: i32,
) -> Vec<ScenarioOutcome> {
    scenarios
        .par_iter()
        .map(|scenario| ScenarioOutcome {
            label: scenario.label.clone(),
            result: calculate_retirement(&scenario.assumptions, accounts, start_year),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProjectionError;
    use crate::core::types::{ContributionFrequency, ContributionSchedule};

    fn base_assumptions() -> AssumptionsInput {
        AssumptionsInput {
            annual_spending_target: 50_000.0,
            inflation_rate: 0.025,
            retirement_tax_rate: 0.12,
            withdrawal_rate: 0.04,
            retirement_growth_rate: 0.04,
            investment_fee_rate: 0.002,
            current_age: 32,
            desired_retirement_age: None,
            life_expectancy: Some(92),
        }
    }

    fn accounts() -> Vec<AccountInput> {
        let mut brokerage = AccountInput::new("brokerage", 80_000.0, 0.07);
        brokerage.contributions = Some(ContributionSchedule {
            amount: 2_000.0,
            frequency: ContributionFrequency::Monthly,
            growth: None,
            start_year: None,
            end_year: None,
        });
        vec![brokerage]
    }

    fn scenario(label: &str, spending: f64) -> Scenario {
        let mut assumptions = base_assumptions();
        assumptions.annual_spending_target = spending;
        Scenario {
            label: label.to_string(),
            assumptions,
        }
    }

    #[test]
    fn outcomes_keep_input_order() {
        let scenarios = vec![
            scenario("lean", 30_000.0),
            scenario("base", 50_000.0),
            scenario("fat", 90_000.0),
        ];
        let outcomes = compare_scenarios(&scenarios, &accounts(), 2025);
        let labels: Vec<_> = outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["lean", "base", "fat"]);
    }

    #[test]
    fn outcomes_match_individual_runs() {
        let scenarios = vec![scenario("lean", 30_000.0), scenario("fat", 90_000.0)];
        let accounts = accounts();
        let outcomes = compare_scenarios(&scenarios, &accounts, 2025);
        for (scenario, outcome) in scenarios.iter().zip(outcomes.iter()) {
            let direct = calculate_retirement(&scenario.assumptions, &accounts, 2025);
            assert_eq!(outcome.result, direct);
        }
    }

    #[test]
    fn leaner_spending_retires_no_later() {
        let scenarios = vec![scenario("lean", 30_000.0), scenario("fat", 90_000.0)];
        let outcomes = compare_scenarios(&scenarios, &accounts(), 2025);
        let lean = outcomes[0].summary().expect("lean scenario is valid");
        let fat = outcomes[1].summary().expect("fat scenario is valid");
        assert!(lean.retirement_year <= fat.retirement_year);
        assert_eq!(lean.years_until_retirement, (lean.retirement_year - 2025) as u32);
    }

    #[test]
    fn invalid_scenario_does_not_affect_others() {
        let mut broken = scenario("broken", 40_000.0);
        broken.assumptions.withdrawal_rate = 4.0;
        let scenarios = vec![scenario("base", 50_000.0), broken];
        let outcomes = compare_scenarios(&scenarios, &accounts(), 2025);

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(ProjectionError::InvalidAssumptions(_))
        ));
        assert!(outcomes[1].summary().is_none());
    }

    #[test]
    fn empty_scenario_list_yields_no_outcomes() {
        assert!(compare_scenarios(&[], &accounts(), 2025).is_empty());
    }
}
