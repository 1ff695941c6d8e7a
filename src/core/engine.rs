use std::collections::BTreeMap;

use log::debug;

use super::error::ProjectionResult;
use super::types::{
    AccountInput, AssumptionsInput, ContributionGrowth, ContributionSchedule, HORIZON_YEARS,
    RetirementResult, RetirementTrigger, YearProjection,
};
use super::validation::{validate_accounts, validate_assumptions, validate_start_year};

#[derive(Debug, Clone, Copy)]
struct YearFlows {
    contributions: f64,
    growth: f64,
    events: f64,
}

#[derive(Debug, Clone, Copy)]
struct Affordability {
    inflation_adjusted_spending: f64,
    supported_retirement_income: f64,
    after_tax_income: f64,
    can_retire: bool,
}

#[derive(Debug, Clone, Copy)]
struct RetirementLatch {
    years_since_start: u32,
    trigger: RetirementTrigger,
}

/// Runs one deterministic forward projection over the fixed horizon.
///
/// `start_year` anchors simulated year zero. Inputs are validated up front;
/// the per-year order is contributions, growth, events, then affordability.
pub fn calculate_retirement(
    assumptions: &AssumptionsInput,
    accounts: &[AccountInput],
    start_year: i32,
) -> ProjectionResult<RetirementResult> {
    validate_assumptions(assumptions)?;
    validate_start_year(start_year)?;
    validate_accounts(accounts)?;

    debug!(
        "projecting {} account(s) from {start_year} at age {}",
        accounts.len(),
        assumptions.current_age
    );

    // Balances are indexed by account position and never leave this call.
    let mut balances: Vec<f64> = accounts.iter().map(|a| a.current_balance).collect();
    let mut projections = Vec::with_capacity(HORIZON_YEARS as usize + 1);
    let mut latch: Option<RetirementLatch> = None;

    for years_since_start in 0..=HORIZON_YEARS {
        let year = start_year + years_since_start as i32;
        let age = assumptions.current_age + years_since_start;

        let flows = YearFlows {
            contributions: apply_contributions(accounts, &mut balances, year, years_since_start),
            growth: apply_growth(assumptions, accounts, &mut balances),
            events: apply_events(assumptions, accounts, &mut balances, year, start_year),
        };

        let account_breakdown = snapshot_balances(accounts, &balances);
        let portfolio_value: f64 = account_breakdown.values().sum();
        let affordability =
            evaluate_affordability(assumptions, accounts, portfolio_value, years_since_start, age);

        if latch.is_none() {
            latch = resolve_retirement(assumptions, &affordability, years_since_start, age);
        }

        projections.push(YearProjection {
            year,
            age,
            portfolio_value,
            total_contributions: flows.contributions,
            portfolio_growth: flows.growth,
            event_impact: flows.events,
            inflation_adjusted_spending: affordability.inflation_adjusted_spending,
            supported_retirement_income: affordability.supported_retirement_income,
            after_tax_income: affordability.after_tax_income,
            can_retire: affordability.can_retire,
            account_breakdown,
        });
    }

    Ok(build_result(assumptions, start_year, latch, projections))
}

fn apply_contributions(
    accounts: &[AccountInput],
    balances: &mut [f64],
    year: i32,
    years_since_start: u32,
) -> f64 {
    let mut total = 0.0;
    for (account, balance) in accounts.iter().zip(balances.iter_mut()) {
        let Some(schedule) = &account.contributions else {
            continue;
        };
        let Some(amount) = scheduled_contribution(schedule, year, years_since_start) else {
            continue;
        };
        *balance += amount;
        total += amount;
    }
    total
}

/// Contribution for one schedule in `year`, or `None` outside its window.
fn scheduled_contribution(
    schedule: &ContributionSchedule,
    year: i32,
    years_since_start: u32,
) -> Option<f64> {
    if schedule.start_year.is_some_and(|start| year < start)
        || schedule.end_year.is_some_and(|end| year > end)
    {
        return None;
    }

    let base = schedule.amount * schedule.frequency.periods_per_year();
    if years_since_start == 0 {
        return Some(base);
    }

    let amount = match schedule.growth {
        Some(ContributionGrowth::Percentage(rate)) => {
            base * (1.0 + rate).powi(years_since_start as i32)
        }
        Some(ContributionGrowth::Flat(step)) => base + step * years_since_start as f64,
        None => base,
    };
    Some(amount)
}

fn apply_growth(
    assumptions: &AssumptionsInput,
    accounts: &[AccountInput],
    balances: &mut [f64],
) -> f64 {
    let mut total = 0.0;
    for (account, balance) in accounts.iter().zip(balances.iter_mut()) {
        let effective_return = account.annual_return_rate - assumptions.investment_fee_rate;
        let growth = *balance * effective_return;
        *balance += growth;
        total += growth;
    }
    total
}

fn apply_events(
    assumptions: &AssumptionsInput,
    accounts: &[AccountInput],
    balances: &mut [f64],
    year: i32,
    start_year: i32,
) -> f64 {
    let mut total = 0.0;
    for (account, balance) in accounts.iter().zip(balances.iter_mut()) {
        for event in account.events.iter().filter(|event| event.year == year) {
            let amount = if event.inflation_adjusted {
                event.amount * (1.0 + assumptions.inflation_rate).powi(year - start_year)
            } else {
                event.amount
            };
            *balance += amount;
            total += amount;
        }
    }
    total
}

fn snapshot_balances(accounts: &[AccountInput], balances: &[f64]) -> BTreeMap<String, f64> {
    accounts
        .iter()
        .zip(balances.iter())
        .map(|(account, balance)| (account.id.clone(), *balance))
        .collect()
}

fn fixed_benefit_income(accounts: &[AccountInput], age: u32) -> f64 {
    accounts
        .iter()
        .filter_map(|account| account.benefit)
        .filter(|benefit| age >= benefit.start_age)
        .map(|benefit| benefit.annual_amount)
        .sum()
}

fn evaluate_affordability(
    assumptions: &AssumptionsInput,
    accounts: &[AccountInput],
    portfolio_value: f64,
    years_since_start: u32,
    age: u32,
) -> Affordability {
    let inflation_adjusted_spending = assumptions.annual_spending_target
        * (1.0 + assumptions.inflation_rate).powi(years_since_start as i32);
    let supported_retirement_income = portfolio_value * assumptions.withdrawal_rate;
    let after_tax_income = supported_retirement_income * (1.0 - assumptions.retirement_tax_rate);
    // Benefits are untaxed and stay out of the reported income.
    let benefit_income = fixed_benefit_income(accounts, age);

    Affordability {
        inflation_adjusted_spending,
        supported_retirement_income,
        after_tax_income,
        can_retire: after_tax_income + benefit_income >= inflation_adjusted_spending,
    }
}

fn resolve_retirement(
    assumptions: &AssumptionsInput,
    affordability: &Affordability,
    years_since_start: u32,
    age: u32,
) -> Option<RetirementLatch> {
    if affordability.can_retire {
        return Some(RetirementLatch {
            years_since_start,
            trigger: RetirementTrigger::Affordability,
        });
    }
    if assumptions.desired_retirement_age == Some(age) {
        return Some(RetirementLatch {
            years_since_start,
            trigger: RetirementTrigger::DesiredAge,
        });
    }
    None
}

fn build_result(
    assumptions: &AssumptionsInput,
    start_year: i32,
    latch: Option<RetirementLatch>,
    year_by_year_projections: Vec<YearProjection>,
) -> RetirementResult {
    let latch = latch.unwrap_or(RetirementLatch {
        years_since_start: HORIZON_YEARS,
        trigger: RetirementTrigger::HorizonFallback,
    });
    let at_retirement = &year_by_year_projections[latch.years_since_start as usize];

    debug!(
        "retirement resolved to {} via {:?}",
        at_retirement.year, latch.trigger
    );

    RetirementResult {
        retirement_year: start_year + latch.years_since_start as i32,
        retirement_age: assumptions.current_age + latch.years_since_start,
        retirement_trigger: latch.trigger,
        portfolio_at_retirement: at_retirement.portfolio_value,
        annual_income_at_retirement: at_retirement.after_tax_income,
        target_spending_at_retirement: at_retirement.inflation_adjusted_spending,
        year_by_year_projections,
    }
}
