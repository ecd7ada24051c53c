use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CalculationResults, ConfigError, ContributionTiming, EngineConfig, ScenarioData, ValidationError,
    calculate_scenario,
};

#[derive(Debug, Parser)]
#[command(
    name = "wealth-plan",
    about = "Retirement and family protection planner (current, maintenance and consumption scenarios)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the calculation over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Calculate one scenario from a JSON file and print the results.
    Calculate {
        #[arg(long, help = "Path to a scenario JSON file")]
        input: PathBuf,
        #[arg(long, default_value_t = false)]
        pretty: bool,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliContributionTiming {
    Start,
    End,
}

impl From<CliContributionTiming> for ContributionTiming {
    fn from(value: CliContributionTiming) -> Self {
        match value {
            CliContributionTiming::Start => ContributionTiming::StartOfPeriod,
            CliContributionTiming::End => ContributionTiming::EndOfPeriod,
        }
    }
}

/// Engine overrides. Rates are given in percent on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    #[arg(long, help = "Engine configuration JSON file applied before the flags")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub contribution_timing: Option<CliContributionTiming>,
    #[arg(long, help = "Months of family expense in immediate protection")]
    pub protection_months: Option<u32>,
    #[arg(long, help = "Succession cost as percent of non-sellable assets")]
    pub succession_cost_rate: Option<f64>,
    #[arg(long)]
    pub dependent_support_until_age: Option<u32>,
    #[arg(long, default_value_t = false)]
    pub exclude_family_projects: bool,
    #[arg(long, help = "Withholding tax in percent for gross portfolios")]
    pub withholding_tax_rate: Option<f64>,
    #[arg(long)]
    pub conservative_ceiling: Option<f64>,
    #[arg(long)]
    pub moderate_ceiling: Option<f64>,
    #[arg(long)]
    pub moderate_aggressive_ceiling: Option<f64>,
    #[arg(long)]
    pub aggressive_ceiling: Option<f64>,
    #[arg(long)]
    pub solver_max_iterations: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid scenario: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field) = match &self {
            ApiError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, Some(err.field.clone())),
            ApiError::Json(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Config(_) | ApiError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let message = match &self {
            ApiError::Validation(err) => err.message.clone(),
            other => other.to_string(),
        };
        json_response(
            status,
            ErrorResponse {
                error: message,
                field,
            },
        )
    }
}

#[derive(Debug, Clone)]
struct AppState {
    config: Arc<EngineConfig>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn run(cli: Cli) -> Result<(), ApiError> {
    match cli.command {
        Command::Serve { port, config } => {
            let config = build_config(&config)?;
            run_http_server(port, config)
                .await
                .map_err(|source| ApiError::Io {
                    path: format!("0.0.0.0:{port}"),
                    source,
                })
        }
        Command::Calculate {
            input,
            pretty,
            config,
        } => {
            let config = build_config(&config)?;
            let json = read_file(&input)?;
            let results = calculate_from_json(&json, &config)?;
            let out = if pretty {
                serde_json::to_string_pretty(&results)?
            } else {
                serde_json::to_string(&results)?
            };
            println!("{out}");
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> Result<String, ApiError> {
    fs::read_to_string(path).map_err(|source| ApiError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn build_config(args: &ConfigArgs) -> Result<EngineConfig, ApiError> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<EngineConfig>(&read_file(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(timing) = args.contribution_timing {
        config.contribution_timing = timing.into();
    }
    if let Some(months) = args.protection_months {
        config.protection_months = months;
    }
    if let Some(rate) = args.succession_cost_rate {
        config.succession_cost_rate = rate / 100.0;
    }
    if let Some(age) = args.dependent_support_until_age {
        config.dependent_support_until_age = Some(age);
    }
    if args.exclude_family_projects {
        config.include_family_projects_in_protection = false;
    }
    if let Some(rate) = args.withholding_tax_rate {
        config.withholding_tax_rate = rate / 100.0;
    }
    let ceilings = &mut config.profile_ceilings;
    for (flag, target) in [
        (args.conservative_ceiling, &mut ceilings.conservative),
        (args.moderate_ceiling, &mut ceilings.moderate),
        (args.moderate_aggressive_ceiling, &mut ceilings.moderate_aggressive),
        (args.aggressive_ceiling, &mut ceilings.aggressive),
    ] {
        if let Some(value) = flag {
            *target = value;
        }
    }
    if let Some(iterations) = args.solver_max_iterations {
        config.solver.max_iterations = iterations;
    }

    config.validate()?;
    Ok(config)
}

fn calculate_from_json(json: &str, config: &EngineConfig) -> Result<CalculationResults, ApiError> {
    let data = serde_json::from_str::<ScenarioData>(json)?;
    Ok(calculate_scenario(&data, config, Utc::now())?)
}

fn router(config: EngineConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/scenarios/calculate", post(calculate_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, config: EngineConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "wealth planning API listening");
    axum::serve(listener, router(config)).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            error: "Not found".to_string(),
            field: None,
        },
    )
}

async fn calculate_handler(
    State(state): State<AppState>,
    Json(data): Json<ScenarioData>,
) -> Result<Response, ApiError> {
    info!(
        age = data.personal_data.age,
        retirement_age = data.personal_data.retirement_age,
        "calculating scenario"
    );
    let results = calculate_scenario(&data, &state.config, Utc::now()).inspect_err(|err| {
        warn!(field = %err.field, message = %err.message, "scenario rejected");
    })?;
    Ok(json_response(StatusCode::OK, results))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
