use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    CategoryCosts, ChartBar, ComparisonConstraints, CoreError, CountyBudgetRecord,
    DEFAULT_RESULT_COUNT, DeviationRatios, FamilyType, MAX_CHILDREN, ProjectedCountyRecord,
    RankingReport, ReferenceDataset, UserBudgetInput, baseline_report, chart_series,
    compute_baseline_budget, compute_deviation, compute_ranking, deviation_report,
};

pub const DATASET_ENV_VAR: &str = "AFFORDABLE_COUNTY_DATASET";
pub const DEFAULT_DATASET_PATH: &str = "data/county_budgets.csv";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliReport {
    Baseline,
    Comparison,
    Ranking,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutput {
    Text,
    Json,
}

/// Accepts `["OR", "WA"]` from JSON bodies and `OR,WA` from query strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StateList {
    Csv(String),
    List(Vec<String>),
}

impl StateList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StateList::Csv(raw) => raw.split(',').map(str::to_string).collect(),
            StateList::List(states) => states,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BudgetPayload {
    county: Option<String>,
    parents: Option<u8>,
    children: Option<u8>,

    income: Option<u64>,
    housing: Option<u64>,
    food: Option<u64>,
    transportation: Option<u64>,
    healthcare: Option<u64>,
    childcare: Option<u64>,
    other_necessities: Option<u64>,
    taxes: Option<u64>,

    maintain_income_exact: Option<bool>,
    enforce_income_cap: Option<bool>,
    income_cap_amount: Option<u64>,
    include_all_states: Option<bool>,
    allowed_states: Option<StateList>,
    result_count: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(
    name = "affordable-county",
    about = "Finds the U.S. counties where your family's budget would leave the most money each month"
)]
struct Cli {
    #[arg(
        long,
        env = "AFFORDABLE_COUNTY_DATASET",
        default_value = "data/county_budgets.csv",
        help = "Cleaned county budget CSV"
    )]
    dataset: PathBuf,
    #[arg(long, value_enum, default_value_t = CliReport::Ranking)]
    report: CliReport,
    #[arg(long, value_enum, default_value_t = CliOutput::Text)]
    output: CliOutput,
    #[arg(long, help = "County of primary residence, e.g. \"Travis County, TX\"")]
    county: String,
    #[arg(long, default_value_t = 1, help = "Number of adults in the household (1 or 2)")]
    parents: u8,
    #[arg(long, default_value_t = 0, help = "Number of children (0 to 4)")]
    children: u8,
    #[arg(long, default_value_t = 0, help = "Monthly family income, pre-tax")]
    income: u64,
    #[arg(long, default_value_t = 0, help = "Monthly housing spending, utilities included")]
    housing: u64,
    #[arg(long, default_value_t = 0)]
    food: u64,
    #[arg(
        long,
        default_value_t = 0,
        help = "Gas, car payment and repair, transit passes"
    )]
    transportation: u64,
    #[arg(
        long,
        default_value_t = 0,
        help = "Out-of-pocket healthcare and premiums"
    )]
    healthcare: u64,
    #[arg(long, default_value_t = 0)]
    childcare: u64,
    #[arg(
        long,
        default_value_t = 0,
        help = "Clothes, household and school supplies"
    )]
    other_necessities: u64,
    #[arg(long, default_value_t = 0)]
    taxes: u64,
    #[arg(long, help = "Keep your exact income in every county")]
    maintain_income_exact: bool,
    #[arg(long, help = "Clamp projected income to --income-cap-amount")]
    enforce_income_cap: bool,
    #[arg(long)]
    income_cap_amount: Option<u64>,
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = true,
        help = "Rank counties from every state; ignored when --state is given"
    )]
    include_all_states: bool,
    #[arg(
        long = "state",
        value_delimiter = ',',
        help = "Only rank counties in these states (repeat or comma-separate)"
    )]
    states: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_RESULT_COUNT, help = "Number of counties to show")]
    results: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum FieldNames {
    Cli,
    Api,
}

impl FieldNames {
    fn pick(self, flag: &'static str, key: &'static str) -> &'static str {
        match self {
            FieldNames::Cli => flag,
            FieldNames::Api => key,
        }
    }
}

#[derive(Debug)]
struct BudgetRequest {
    input: UserBudgetInput,
    constraints: ComparisonConstraints,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    county_states: Vec<String>,
    states: Vec<String>,
    family_types: Vec<FamilyType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaselineResponse {
    record: CountyBudgetRecord,
    report: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonResponse {
    county_state: String,
    family_type: FamilyType,
    ratios: DeviationRatios,
    report: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankingResponse {
    available: usize,
    requested: usize,
    fewer_than_requested: bool,
    counties: Vec<ProjectedCountyRecord>,
    report: RankingReport,
    report_text: String,
    chart: Vec<ChartBar>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli, names: FieldNames) -> Result<BudgetRequest, String> {
    let county_state = cli.county.trim();
    if county_state.is_empty() {
        return Err(format!("{} is required", names.pick("--county", "county")));
    }

    let family_type = FamilyType::new(cli.parents, cli.children).map_err(|_| {
        format!(
            "{} must be 1 or 2 and {} must be between 0 and {MAX_CHILDREN}",
            names.pick("--parents", "parents"),
            names.pick("--children", "children"),
        )
    })?;

    if cli.results == 0 {
        return Err(format!(
            "{} must be > 0",
            names.pick("--results", "resultCount")
        ));
    }

    if cli.enforce_income_cap && cli.income_cap_amount.is_none() {
        return Err(format!(
            "{} is required when {} is set",
            names.pick("--income-cap-amount", "incomeCapAmount"),
            names.pick("--enforce-income-cap", "enforceIncomeCap"),
        ));
    }

    let allowed_states: BTreeSet<String> = cli
        .states
        .iter()
        .map(|state| state.trim().to_ascii_uppercase())
        .filter(|state| !state.is_empty())
        .collect();

    if let Some(bad) = allowed_states.iter().find(|state| state.len() != 2) {
        return Err(format!(
            "{} expects two-letter state codes, got {bad:?}",
            names.pick("--state", "allowedStates")
        ));
    }

    Ok(BudgetRequest {
        input: UserBudgetInput {
            county_state: county_state.to_string(),
            family_type,
            income: cli.income,
            spending: CategoryCosts {
                housing: cli.housing,
                food: cli.food,
                transportation: cli.transportation,
                healthcare: cli.healthcare,
                childcare: cli.childcare,
                other_necessities: cli.other_necessities,
                taxes: cli.taxes,
            },
        },
        constraints: ComparisonConstraints {
            maintain_income_exact: cli.maintain_income_exact,
            enforce_income_cap: cli.enforce_income_cap,
            income_cap_amount: cli.income_cap_amount,
            include_all_states: cli.include_all_states && allowed_states.is_empty(),
            allowed_states,
            result_count: cli.results,
        },
    })
}

pub fn dataset_path_from_env() -> PathBuf {
    std::env::var_os(DATASET_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH))
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let report = cli.report;
    let output = cli.output;
    let dataset = ReferenceDataset::from_path(&cli.dataset).map_err(|e| e.to_string())?;
    let request = build_request(cli, FieldNames::Cli)?;

    let rendered = match (report, output) {
        (CliReport::Baseline, CliOutput::Text) => {
            build_baseline_response(&dataset, &request)
                .map_err(|e| e.to_string())?
                .report
        }
        (CliReport::Baseline, CliOutput::Json) => to_json(
            &build_baseline_response(&dataset, &request).map_err(|e| e.to_string())?,
        )?,
        (CliReport::Comparison, CliOutput::Text) => {
            build_comparison_response(&dataset, &request)
                .map_err(|e| e.to_string())?
                .report
        }
        (CliReport::Comparison, CliOutput::Json) => to_json(
            &build_comparison_response(&dataset, &request).map_err(|e| e.to_string())?,
        )?,
        (CliReport::Ranking, CliOutput::Text) => {
            build_ranking_response(&dataset, &request)
                .map_err(|e| e.to_string())?
                .report_text
        }
        (CliReport::Ranking, CliOutput::Json) => to_json(
            &build_ranking_response(&dataset, &request).map_err(|e| e.to_string())?,
        )?,
    };

    println!("{rendered}");
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode JSON: {e}"))
}

fn router(dataset: Arc<ReferenceDataset>) -> Router {
    Router::new()
        .route("/api/options", get(options_handler))
        .route(
            "/api/baseline",
            get(baseline_get_handler).post(baseline_post_handler),
        )
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route("/api/rank", get(rank_get_handler).post(rank_post_handler))
        .fallback(not_found_handler)
        .with_state(dataset)
}

pub async fn run_http_server(dataset: Arc<ReferenceDataset>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(dataset);

    let listener = TcpListener::bind(addr).await?;
    log::info!("Affordable county HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/options");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn options_handler(State(dataset): State<Arc<ReferenceDataset>>) -> Response {
    json_response(StatusCode::OK, build_options_response(&dataset))
}

async fn baseline_get_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Query<BudgetPayload>, QueryRejection>,
) -> Response {
    respond(from_query(payload), |request| build_baseline_response(&dataset, request))
}

async fn baseline_post_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Json<BudgetPayload>, JsonRejection>,
) -> Response {
    respond(from_json(payload), |request| build_baseline_response(&dataset, request))
}

async fn compare_get_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Query<BudgetPayload>, QueryRejection>,
) -> Response {
    respond(from_query(payload), |request| build_comparison_response(&dataset, request))
}

async fn compare_post_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Json<BudgetPayload>, JsonRejection>,
) -> Response {
    respond(from_json(payload), |request| build_comparison_response(&dataset, request))
}

async fn rank_get_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Query<BudgetPayload>, QueryRejection>,
) -> Response {
    respond(from_query(payload), |request| build_ranking_response(&dataset, request))
}

async fn rank_post_handler(
    State(dataset): State<Arc<ReferenceDataset>>,
    payload: Result<Json<BudgetPayload>, JsonRejection>,
) -> Response {
    respond(from_json(payload), |request| build_ranking_response(&dataset, request))
}

fn from_query(
    payload: Result<Query<BudgetPayload>, QueryRejection>,
) -> Result<BudgetPayload, String> {
    payload
        .map(|Query(payload)| payload)
        .map_err(|rejection| format!("Invalid query string: {}", rejection.body_text()))
}

fn from_json(
    payload: Result<Json<BudgetPayload>, JsonRejection>,
) -> Result<BudgetPayload, String> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| format!("Invalid API JSON payload: {}", rejection.body_text()))
}

fn respond<T: Serialize>(
    payload: Result<BudgetPayload, String>,
    compute: impl FnOnce(&BudgetRequest) -> Result<T, CoreError>,
) -> Response {
    let request = match payload.and_then(request_from_payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match compute(&request) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => core_error_response(&err),
    }
}

fn core_error_response(err: &CoreError) -> Response {
    let status = match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::InvalidConstraint(_) | CoreError::InvalidFamilyType(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    error_response(status, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
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

fn build_options_response(dataset: &ReferenceDataset) -> OptionsResponse {
    OptionsResponse {
        county_states: dataset
            .county_states()
            .into_iter()
            .map(str::to_string)
            .collect(),
        states: dataset.states().into_iter().map(str::to_string).collect(),
        family_types: FamilyType::all().collect(),
    }
}

fn build_baseline_response(
    dataset: &ReferenceDataset,
    request: &BudgetRequest,
) -> Result<BaselineResponse, CoreError> {
    let record = compute_baseline_budget(
        dataset,
        &request.input.county_state,
        request.input.family_type,
    )?;
    let report = baseline_report(&record);
    Ok(BaselineResponse { record, report })
}

fn build_comparison_response(
    dataset: &ReferenceDataset,
    request: &BudgetRequest,
) -> Result<ComparisonResponse, CoreError> {
    let ratios = compute_deviation(dataset, &request.input)?;
    Ok(ComparisonResponse {
        county_state: request.input.county_state.clone(),
        family_type: request.input.family_type,
        report: deviation_report(&ratios, request.input.family_type),
        ratios,
    })
}

fn build_ranking_response(
    dataset: &ReferenceDataset,
    request: &BudgetRequest,
) -> Result<RankingResponse, CoreError> {
    let ranked = compute_ranking(dataset, &request.input, &request.constraints)?;
    let report = RankingReport::build(&ranked, &request.constraints);
    Ok(RankingResponse {
        available: ranked.available,
        requested: ranked.requested,
        fewer_than_requested: ranked.fewer_than_requested,
        report_text: report.render(),
        chart: chart_series(&ranked),
        report,
        counties: ranked.entries,
    })
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<BudgetRequest, String> {
    let payload = serde_json::from_str::<BudgetPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: BudgetPayload) -> Result<BudgetRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.county {
        cli.county = v;
    }
    if let Some(v) = payload.parents {
        cli.parents = v;
    }
    if let Some(v) = payload.children {
        cli.children = v;
    }

    if let Some(v) = payload.income {
        cli.income = v;
    }
    if let Some(v) = payload.housing {
        cli.housing = v;
    }
    if let Some(v) = payload.food {
        cli.food = v;
    }
    if let Some(v) = payload.transportation {
        cli.transportation = v;
    }
    if let Some(v) = payload.healthcare {
        cli.healthcare = v;
    }
    if let Some(v) = payload.childcare {
        cli.childcare = v;
    }
    if let Some(v) = payload.other_necessities {
        cli.other_necessities = v;
    }
    if let Some(v) = payload.taxes {
        cli.taxes = v;
    }

    if let Some(v) = payload.maintain_income_exact {
        cli.maintain_income_exact = v;
    }
    if let Some(v) = payload.enforce_income_cap {
        cli.enforce_income_cap = v;
    }
    if let Some(v) = payload.income_cap_amount {
        cli.income_cap_amount = Some(v);
    }
    if let Some(v) = payload.include_all_states {
        cli.include_all_states = v;
    }
    if let Some(v) = payload.allowed_states {
        // An explicit state list only restricts when all states are switched off.
        if !cli.include_all_states {
            cli.states = v.into_vec();
        }
    }
    if let Some(v) = payload.result_count {
        cli.results = v;
    }

    build_request(cli, FieldNames::Api)
}

fn default_cli_for_api() -> Cli {
    Cli {
        dataset: PathBuf::from(DEFAULT_DATASET_PATH),
        report: CliReport::Ranking,
        output: CliOutput::Json,
        county: String::new(),
        parents: 1,
        children: 0,
        income: 0,
        housing: 0,
        food: 0,
        transportation: 0,
        healthcare: 0,
        childcare: 0,
        other_necessities: 0,
        taxes: 0,
        maintain_income_exact: false,
        enforce_income_cap: false,
        income_cap_amount: None,
        include_all_states: true,
        states: Vec::new(),
        results: DEFAULT_RESULT_COUNT,
    }
}
