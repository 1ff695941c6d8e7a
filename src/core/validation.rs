use std::collections::HashSet;

use log::warn;

use super::error::{ProjectionError, ProjectionResult};
use super::types::{AccountInput, AssumptionsInput, ContributionGrowth, HORIZON_YEARS};

/// Oldest accepted `currentAge`.
pub const MAX_CURRENT_AGE: u32 = 150;

pub fn validate_assumptions(assumptions: &AssumptionsInput) -> ProjectionResult<()> {
    if !assumptions.annual_spending_target.is_finite() || assumptions.annual_spending_target < 0.0
    {
        return Err(ProjectionError::InvalidAssumptions(
            "annualSpendingTarget must be a finite amount >= 0".to_string(),
        ));
    }

    for (name, rate) in [
        ("inflationRate", assumptions.inflation_rate),
        ("retirementTaxRate", assumptions.retirement_tax_rate),
        ("withdrawalRate", assumptions.withdrawal_rate),
        ("retirementGrowthRate", assumptions.retirement_growth_rate),
        ("investmentFeeRate", assumptions.investment_fee_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ProjectionError::InvalidAssumptions(format!(
                "{name} must be between 0 and 1, got {rate}"
            )));
        }
    }

    if assumptions.current_age == 0 {
        return Err(ProjectionError::InvalidAssumptions(
            "currentAge must be > 0".to_string(),
        ));
    }
    if assumptions.current_age > MAX_CURRENT_AGE {
        return Err(ProjectionError::InvalidAssumptions(format!(
            "currentAge must be <= {MAX_CURRENT_AGE}, got {}",
            assumptions.current_age
        )));
    }

    if let Some(life_expectancy) = assumptions.life_expectancy {
        if life_expectancy <= assumptions.current_age {
            return Err(ProjectionError::InvalidAssumptions(format!(
                "lifeExpectancy ({life_expectancy}) must be > currentAge ({})",
                assumptions.current_age
            )));
        }
    }

    if let Some(desired) = assumptions.desired_retirement_age {
        if desired < assumptions.current_age {
            warn!(
                "desiredRetirementAge {desired} is below currentAge {}; it can never trigger",
                assumptions.current_age
            );
        }
    }

    Ok(())
}

/// Rejects anchor years whose horizon would not fit in an `i32`.
pub fn validate_start_year(start_year: i32) -> ProjectionResult<()> {
    if start_year.checked_add(HORIZON_YEARS as i32).is_none() {
        return Err(ProjectionError::InvalidAssumptions(format!(
            "startYear {start_year} leaves no room for a {HORIZON_YEARS}-year horizon"
        )));
    }
    Ok(())
}

pub fn validate_accounts(accounts: &[AccountInput]) -> ProjectionResult<()> {
    let mut seen = HashSet::with_capacity(accounts.len());

    for account in accounts {
        let id = account.id.as_str();
        if id.trim().is_empty() {
            return Err(ProjectionError::account(id, "id must not be empty"));
        }
        if !seen.insert(id) {
            return Err(ProjectionError::account(id, "duplicate account id"));
        }

        if !account.current_balance.is_finite() || account.current_balance < 0.0 {
            return Err(ProjectionError::account(
                id,
                "currentBalance must be a finite amount >= 0",
            ));
        }

        if !(-1.0..=1.0).contains(&account.annual_return_rate) {
            return Err(ProjectionError::account(
                id,
                "annualReturnRate must be between -1 and 1",
            ));
        }

        if let Some(schedule) = &account.contributions {
            if !schedule.amount.is_finite() || schedule.amount < 0.0 {
                return Err(ProjectionError::account(
                    id,
                    "contribution amount must be a finite amount >= 0",
                ));
            }

            match schedule.growth {
                Some(ContributionGrowth::Percentage(rate)) if !rate.is_finite() || rate <= -1.0 => {
                    return Err(ProjectionError::account(
                        id,
                        "percentage contribution growth must be > -1",
                    ));
                }
                Some(ContributionGrowth::Flat(step)) if !step.is_finite() => {
                    return Err(ProjectionError::account(
                        id,
                        "flat contribution growth must be finite",
                    ));
                }
                _ => {}
            }

            if let (Some(start), Some(end)) = (schedule.start_year, schedule.end_year) {
                if end < start {
                    return Err(ProjectionError::account(
                        id,
                        format!("contribution endYear {end} is before startYear {start}"),
                    ));
                }
            }
        }

        if let Some(event) = account.events.iter().find(|event| !event.amount.is_finite()) {
            return Err(ProjectionError::account(
                id,
                format!("event amount for {} must be finite", event.year),
            ));
        }

        if let Some(benefit) = account.benefit {
            if !benefit.annual_amount.is_finite() || benefit.annual_amount < 0.0 {
                return Err(ProjectionError::account(
                    id,
                    "annualBenefit must be a finite amount >= 0",
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        AccountEvent, ContributionFrequency, ContributionSchedule, FixedBenefit,
    };

    fn sample_assumptions() -> AssumptionsInput {
        AssumptionsInput {
            annual_spending_target: 60_000.0,
            inflation_rate: 0.03,
            retirement_tax_rate: 0.15,
            withdrawal_rate: 0.04,
            retirement_growth_rate: 0.05,
            investment_fee_rate: 0.005,
            current_age: 35,
            desired_retirement_age: Some(60),
            life_expectancy: Some(90),
        }
    }

    fn schedule() -> ContributionSchedule {
        ContributionSchedule {
            amount: 500.0,
            frequency: ContributionFrequency::Monthly,
            growth: None,
            start_year: None,
            end_year: None,
        }
    }

    fn reason_of(err: ProjectionError) -> String {
        match err {
            ProjectionError::InvalidAccount { reason, .. } => reason,
            other => panic!("expected InvalidAccount, got {other:?}"),
        }
    }

    #[test]
    fn sample_assumptions_are_valid() {
        assert!(validate_assumptions(&sample_assumptions()).is_ok());
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let mut assumptions = sample_assumptions();
        assumptions.withdrawal_rate = 1.5;
        let err = validate_assumptions(&assumptions).expect_err("must reject rate > 1");
        assert!(err.to_string().contains("withdrawalRate"));

        let mut assumptions = sample_assumptions();
        assumptions.inflation_rate = -0.01;
        let err = validate_assumptions(&assumptions).expect_err("must reject rate < 0");
        assert!(err.to_string().contains("inflationRate"));
    }

    #[test]
    fn rejects_nan_rate() {
        let mut assumptions = sample_assumptions();
        assumptions.investment_fee_rate = f64::NAN;
        let err = validate_assumptions(&assumptions).expect_err("must reject NaN");
        assert!(err.to_string().contains("investmentFeeRate"));
    }

    #[test]
    fn rejects_negative_spending_target() {
        let mut assumptions = sample_assumptions();
        assumptions.annual_spending_target = -1.0;
        assert!(matches!(
            validate_assumptions(&assumptions),
            Err(ProjectionError::InvalidAssumptions(_))
        ));
    }

    #[test]
    fn rejects_zero_current_age() {
        let mut assumptions = sample_assumptions();
        assumptions.current_age = 0;
        let err = validate_assumptions(&assumptions).expect_err("must reject age 0");
        assert!(err.to_string().contains("currentAge"));
    }

    #[test]
    fn rejects_current_age_above_cap() {
        let mut assumptions = sample_assumptions();
        assumptions.life_expectancy = None;
        assumptions.current_age = MAX_CURRENT_AGE;
        assert!(validate_assumptions(&assumptions).is_ok());

        for age in [MAX_CURRENT_AGE + 1, u32::MAX - 10] {
            assumptions.current_age = age;
            let err = validate_assumptions(&assumptions).expect_err("must reject huge age");
            assert!(matches!(err, ProjectionError::InvalidAssumptions(_)));
            assert!(err.to_string().contains("currentAge"));
        }
    }

    #[test]
    fn start_year_must_leave_room_for_horizon() {
        assert!(validate_start_year(2025).is_ok());
        assert!(validate_start_year(i32::MAX - HORIZON_YEARS as i32).is_ok());
        let err = validate_start_year(i32::MAX - 10).expect_err("must reject overflowing year");
        assert!(err.to_string().contains("startYear"));
    }

    #[test]
    fn rejects_life_expectancy_not_after_current_age() {
        let mut assumptions = sample_assumptions();
        assumptions.life_expectancy = Some(35);
        let err = validate_assumptions(&assumptions).expect_err("must reject equal ages");
        assert!(err.to_string().contains("lifeExpectancy"));
    }

    #[test]
    fn desired_age_below_current_age_is_accepted() {
        let mut assumptions = sample_assumptions();
        assumptions.desired_retirement_age = Some(30);
        assert!(validate_assumptions(&assumptions).is_ok());
    }

    #[test]
    fn empty_account_list_is_valid() {
        assert!(validate_accounts(&[]).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let accounts = vec![
            AccountInput::new("brokerage", 1_000.0, 0.06),
            AccountInput::new("brokerage", 2_000.0, 0.05),
        ];
        let err = validate_accounts(&accounts).expect_err("must reject duplicate id");
        assert_eq!(reason_of(err), "duplicate account id");
    }

    #[test]
    fn rejects_blank_id() {
        let accounts = vec![AccountInput::new("  ", 1_000.0, 0.06)];
        let err = validate_accounts(&accounts).expect_err("must reject blank id");
        assert_eq!(reason_of(err), "id must not be empty");
    }

    #[test]
    fn rejects_negative_balance() {
        let accounts = vec![AccountInput::new("401k", -5.0, 0.06)];
        let err = validate_accounts(&accounts).expect_err("must reject negative balance");
        assert!(reason_of(err).contains("currentBalance"));
    }

    #[test]
    fn rejects_inverted_contribution_window() {
        let mut account = AccountInput::new("roth", 0.0, 0.07);
        account.contributions = Some(ContributionSchedule {
            start_year: Some(2030),
            end_year: Some(2028),
            ..schedule()
        });
        let err = validate_accounts(&[account]).expect_err("must reject inverted window");
        assert!(reason_of(err).contains("endYear"));
    }

    #[test]
    fn accepts_single_year_contribution_window() {
        let mut account = AccountInput::new("roth", 0.0, 0.07);
        account.contributions = Some(ContributionSchedule {
            start_year: Some(2030),
            end_year: Some(2030),
            ..schedule()
        });
        assert!(validate_accounts(&[account]).is_ok());
    }

    #[test]
    fn rejects_negative_contribution_amount() {
        let mut account = AccountInput::new("roth", 0.0, 0.07);
        account.contributions = Some(ContributionSchedule {
            amount: -100.0,
            ..schedule()
        });
        let err = validate_accounts(&[account]).expect_err("must reject negative amount");
        assert!(reason_of(err).contains("contribution amount"));
    }

    #[test]
    fn rejects_percentage_growth_at_or_below_minus_one() {
        let mut account = AccountInput::new("roth", 0.0, 0.07);
        account.contributions = Some(ContributionSchedule {
            growth: Some(ContributionGrowth::Percentage(-1.0)),
            ..schedule()
        });
        let err = validate_accounts(&[account]).expect_err("must reject -100% growth");
        assert!(reason_of(err).contains("percentage"));
    }

    #[test]
    fn accepts_negative_flat_growth() {
        let mut account = AccountInput::new("roth", 0.0, 0.07);
        account.contributions = Some(ContributionSchedule {
            growth: Some(ContributionGrowth::Flat(-25.0)),
            ..schedule()
        });
        assert!(validate_accounts(&[account]).is_ok());
    }

    #[test]
    fn rejects_non_finite_event_amount() {
        let mut account = AccountInput::new("cash", 100.0, 0.01);
        account.events.push(AccountEvent {
            year: 2031,
            amount: f64::INFINITY,
            inflation_adjusted: false,
        });
        let err = validate_accounts(&[account]).expect_err("must reject infinite event");
        assert!(reason_of(err).contains("2031"));
    }

    #[test]
    fn rejects_negative_benefit() {
        let mut account = AccountInput::new("pension", 0.0, 0.0);
        account.benefit = Some(FixedBenefit {
            annual_amount: -1.0,
            start_age: 65,
        });
        let err = validate_accounts(&[account]).expect_err("must reject negative benefit");
        assert!(reason_of(err).contains("annualBenefit"));
    }

    #[test]
    fn rejects_return_rate_outside_range() {
        let accounts = vec![AccountInput::new("crypto", 10.0, 2.5)];
        let err = validate_accounts(&accounts).expect_err("must reject 250% return");
        assert!(reason_of(err).contains("annualReturnRate"));
    }
}
