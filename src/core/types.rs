use std::collections::BTreeMap;

use serde::Serialize;

/// Number of simulated years after the anchor year. The projection holds
/// `HORIZON_YEARS + 1` rows because year zero is simulated too.
pub const HORIZON_YEARS: u32 = 50;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContributionFrequency {
    Monthly,
    Annual,
}

impl ContributionFrequency {
    pub fn periods_per_year(self) -> f64 {
        match self {
            ContributionFrequency::Monthly => 12.0,
            ContributionFrequency::Annual => 1.0,
        }
    }
}

/// How a contribution schedule escalates with each simulated year.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ContributionGrowth {
    /// Compound escalation, e.g. `0.03` for 3% a year.
    Percentage(f64),
    /// Linear escalation in money per year.
    Flat(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSchedule {
    pub amount: f64,
    pub frequency: ContributionFrequency,
    pub growth: Option<ContributionGrowth>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountEvent {
    pub year: i32,
    pub amount: f64,
    pub inflation_adjusted: bool,
}

/// Pension-like income paid at a fixed nominal amount from `start_age` on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBenefit {
    pub annual_amount: f64,
    pub start_age: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssumptionsInput {
    pub annual_spending_target: f64,
    pub inflation_rate: f64,
    pub retirement_tax_rate: f64,
    pub withdrawal_rate: f64,
    pub retirement_growth_rate: f64,
    pub investment_fee_rate: f64,
    pub current_age: u32,
    pub desired_retirement_age: Option<u32>,
    pub life_expectancy: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountInput {
    pub id: String,
    pub current_balance: f64,
    pub annual_return_rate: f64,
    pub contributions: Option<ContributionSchedule>,
    pub events: Vec<AccountEvent>,
    pub benefit: Option<FixedBenefit>,
}

impl AccountInput {
    pub fn new(id: impl Into<String>, current_balance: f64, annual_return_rate: f64) -> Self {
        Self {
            id: id.into(),
            current_balance,
            annual_return_rate,
            contributions: None,
            events: Vec::new(),
            benefit: None,
        }
    }
}

/// What set the retirement year of a run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RetirementTrigger {
    Affordability,
    DesiredAge,
    HorizonFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearProjection {
    pub year: i32,
    pub age: u32,
    pub portfolio_value: f64,
    pub total_contributions: f64,
    pub portfolio_growth: f64,
    pub event_impact: f64,
    pub inflation_adjusted_spending: f64,
    pub supported_retirement_income: f64,
    pub after_tax_income: f64,
    pub can_retire: bool,
    pub account_breakdown: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementResult {
    pub retirement_year: i32,
    pub retirement_age: u32,
    pub retirement_trigger: RetirementTrigger,
    pub portfolio_at_retirement: f64,
    pub annual_income_at_retirement: f64,
    pub target_spending_at_retirement: f64,
    pub year_by_year_projections: Vec<YearProjection>,
}

impl RetirementResult {
    /// The per-year row for `retirement_year`.
    pub fn projection_at_retirement(&self) -> Option<&YearProjection> {
        self.year_by_year_projections
            .iter()
            .find(|row| row.year == self.retirement_year)
    }

    /// Whole years from the anchor year to `retirement_year`.
    pub fn years_until_retirement(&self) -> u32 {
        self.year_by_year_projections
            .first()
            .map(|row| (self.retirement_year - row.year).max(0) as u32)
            .unwrap_or(0)
    }
}
