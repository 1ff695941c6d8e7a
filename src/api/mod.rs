use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Datelike;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    AccountEvent, AccountInput, AssumptionsInput, ContributionFrequency, ContributionGrowth,
    ContributionSchedule, FixedBenefit, ProjectionError, RetirementResult, Scenario,
    ScenarioSummary, calculate_retirement, compare_scenarios,
};

const MAX_SCENARIOS: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            request_timeout: Duration::from_millis(2_000),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API JSON payload: {0}")]
    Payload(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("Projection timed out after {0:?}")]
    Timeout(Duration),
    #[error("Projection worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Payload(_) => StatusCode::BAD_REQUEST,
            ApiError::Projection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ApiContributionFrequency {
    #[serde(alias = "monthly")]
    Monthly,
    #[serde(alias = "annual", alias = "ANNUALLY", alias = "annually")]
    Annual,
}

impl From<ApiContributionFrequency> for ContributionFrequency {
    fn from(value: ApiContributionFrequency) -> Self {
        match value {
            ApiContributionFrequency::Monthly => ContributionFrequency::Monthly,
            ApiContributionFrequency::Annual => ContributionFrequency::Annual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ApiGrowthType {
    #[serde(alias = "percentage")]
    Percentage,
    #[serde(alias = "flat")]
    Flat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssumptionsPayload {
    annual_spending_target: f64,
    inflation_rate: f64,
    retirement_tax_rate: f64,
    withdrawal_rate: f64,
    #[serde(default)]
    retirement_growth_rate: f64,
    #[serde(default)]
    investment_fee_rate: f64,
    current_age: u32,
    desired_retirement_age: Option<u32>,
    life_expectancy: Option<u32>,
}

impl From<AssumptionsPayload> for AssumptionsInput {
    fn from(value: AssumptionsPayload) -> Self {
        AssumptionsInput {
            annual_spending_target: value.annual_spending_target,
            inflation_rate: value.inflation_rate,
            retirement_tax_rate: value.retirement_tax_rate,
            withdrawal_rate: value.withdrawal_rate,
            retirement_growth_rate: value.retirement_growth_rate,
            investment_fee_rate: value.investment_fee_rate,
            current_age: value.current_age,
            desired_retirement_age: value.desired_retirement_age,
            life_expectancy: value.life_expectancy,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsPayload {
    amount: f64,
    frequency: ApiContributionFrequency,
    growth_type: Option<ApiGrowthType>,
    growth_value: Option<f64>,
    start_year: Option<i32>,
    end_year: Option<i32>,
}

impl From<ContributionsPayload> for ContributionSchedule {
    fn from(value: ContributionsPayload) -> Self {
        // Growth only applies when both the type and the value are present.
        let growth = match (value.growth_type, value.growth_value) {
            (Some(ApiGrowthType::Percentage), Some(rate)) => {
                Some(ContributionGrowth::Percentage(rate))
            }
            (Some(ApiGrowthType::Flat), Some(step)) => Some(ContributionGrowth::Flat(step)),
            _ => None,
        };
        ContributionSchedule {
            amount: value.amount,
            frequency: value.frequency.into(),
            growth,
            start_year: value.start_year,
            end_year: value.end_year,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    year: i32,
    amount: f64,
    #[serde(default)]
    is_inflation_adjusted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountPayload {
    id: String,
    current_balance: f64,
    annual_return_rate: f64,
    contributions: Option<ContributionsPayload>,
    #[serde(default)]
    events: Vec<EventPayload>,
    annual_benefit: Option<f64>,
    benefit_start_age: Option<u32>,
}

impl AccountPayload {
    fn into_account(self) -> Result<AccountInput, ProjectionError> {
        let benefit = match (self.annual_benefit, self.benefit_start_age) {
            (Some(annual_amount), Some(start_age)) => Some(FixedBenefit {
                annual_amount,
                start_age,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ProjectionError::InvalidAccount {
                    id: self.id,
                    reason: "annualBenefit requires benefitStartAge".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ProjectionError::InvalidAccount {
                    id: self.id,
                    reason: "benefitStartAge requires annualBenefit".to_string(),
                });
            }
        };

        Ok(AccountInput {
            id: self.id,
            current_balance: self.current_balance,
            annual_return_rate: self.annual_return_rate,
            contributions: self.contributions.map(ContributionSchedule::from),
            events: self
                .events
                .into_iter()
                .map(|event| AccountEvent {
                    year: event.year,
                    amount: event.amount,
                    inflation_adjusted: event.is_inflation_adjusted,
                })
                .collect(),
            benefit,
        })
    }
}

fn accounts_from_payload(accounts: Vec<AccountPayload>) -> Result<Vec<AccountInput>, ApiError> {
    if accounts.is_empty() {
        return Err(ProjectionError::EmptyAccountSet.into());
    }
    accounts
        .into_iter()
        .map(|account| account.into_account().map_err(ApiError::from))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionPayload {
    assumptions: AssumptionsPayload,
    #[serde(default)]
    accounts: Vec<AccountPayload>,
    start_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioPayload {
    label: String,
    assumptions: AssumptionsPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenariosPayload {
    #[serde(default)]
    accounts: Vec<AccountPayload>,
    scenarios: Vec<ScenarioPayload>,
    start_year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ProjectionRequest {
    pub assumptions: AssumptionsInput,
    pub accounts: Vec<AccountInput>,
    pub start_year: i32,
}

impl ProjectionRequest {
    fn from_payload(payload: ProjectionPayload, default_start_year: i32) -> Result<Self, ApiError> {
        Ok(Self {
            assumptions: payload.assumptions.into(),
            accounts: accounts_from_payload(payload.accounts)?,
            start_year: payload.start_year.unwrap_or(default_start_year),
        })
    }

    pub fn run(&self) -> Result<RetirementResult, ApiError> {
        Ok(calculate_retirement(
            &self.assumptions,
            &self.accounts,
            self.start_year,
        )?)
    }
}

#[derive(Debug, Clone)]
pub struct ScenariosRequest {
    pub scenarios: Vec<Scenario>,
    pub accounts: Vec<AccountInput>,
    pub start_year: i32,
}

impl ScenariosRequest {
    fn from_payload(payload: ScenariosPayload, default_start_year: i32) -> Result<Self, ApiError> {
        if payload.scenarios.is_empty() {
            return Err(ApiError::Payload("scenarios must not be empty".to_string()));
        }
        if payload.scenarios.len() > MAX_SCENARIOS {
            return Err(ApiError::Payload(format!(
                "at most {MAX_SCENARIOS} scenarios per request"
            )));
        }

        Ok(Self {
            scenarios: payload
                .scenarios
                .into_iter()
                .map(|scenario| Scenario {
                    label: scenario.label,
                    assumptions: scenario.assumptions.into(),
                })
                .collect(),
            accounts: accounts_from_payload(payload.accounts)?,
            start_year: payload.start_year.unwrap_or(default_start_year),
        })
    }

    pub fn run(&self) -> ScenariosResponse {
        let outcomes = compare_scenarios(&self.scenarios, &self.accounts, self.start_year)
            .into_iter()
            .map(|outcome| ScenarioOutcomeResponse {
                summary: outcome.summary(),
                error: outcome.result.as_ref().err().map(ToString::to_string),
                label: outcome.label,
            })
            .collect();
        ScenariosResponse {
            start_year: self.start_year,
            outcomes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcomeResponse {
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScenarioSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosResponse {
    start_year: i32,
    outcomes: Vec<ScenarioOutcomeResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Clone)]
struct AppState {
    request_timeout: Duration,
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

pub fn projection_request_from_json(
    json: &str,
    default_start_year: i32,
) -> Result<ProjectionRequest, ApiError> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| ApiError::Payload(e.to_string()))?;
    ProjectionRequest::from_payload(payload, default_start_year)
}

/// Runs a projection request body and renders the result as JSON.
///
/// `start_year` overrides the body's `startYear`; with neither set the
/// current calendar year is used.
pub fn render_projection_json(
    json: &str,
    start_year: Option<i32>,
    pretty: bool,
) -> Result<String, ApiError> {
    let mut request = projection_request_from_json(json, current_year())?;
    if let Some(year) = start_year {
        request.start_year = year;
    }
    let result = request.run()?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    rendered.map_err(|e| ApiError::Worker(e.to_string()))
}

pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/scenarios", post(scenarios_handler))
        .fallback(not_found_handler)
        .with_state(AppState {
            request_timeout: config.request_timeout,
        })
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let app = router(&config);

    let listener = TcpListener::bind(addr).await?;
    info!("Retirement projection API listening on http://{addr}");
    info!(
        "Projection requests time out after {:?}",
        config.request_timeout
    );

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectionPayload>,
) -> Response {
    let request = match ProjectionRequest::from_payload(payload, current_year()) {
        Ok(request) => request,
        Err(err) => return api_error_response(&err),
    };
    info!(
        "projection request: {} account(s) from {}",
        request.accounts.len(),
        request.start_year
    );

    match run_with_timeout(state.request_timeout, move || request.run()).await {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => api_error_response(&err),
    }
}

async fn scenarios_handler(
    State(state): State<AppState>,
    Json(payload): Json<ScenariosPayload>,
) -> Response {
    let request = match ScenariosRequest::from_payload(payload, current_year()) {
        Ok(request) => request,
        Err(err) => return api_error_response(&err),
    };
    info!(
        "scenario request: {} scenario(s) over {} account(s)",
        request.scenarios.len(),
        request.accounts.len()
    );

    match run_with_timeout(state.request_timeout, move || Ok(request.run())).await {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => api_error_response(&err),
    }
}

/// Runs CPU-bound work on the blocking pool, bounded by `limit`.
async fn run_with_timeout<T, F>(limit: Duration, job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => Err(ApiError::Worker(join_err.to_string())),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn api_error_response(err: &ApiError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        error!("projection request failed: {err}");
    } else {
        warn!("rejected projection request: {err}");
    }
    error_response(status, &err.to_string())
}
