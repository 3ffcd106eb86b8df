use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use cinemateket::types::Programme;
use cinemateket::{DateRange, ProgramFetcher, ScraperError};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Clone)]
pub struct AppState {
    fetcher: ProgramFetcher,
}

impl AppState {
    pub fn new(fetcher: ProgramFetcher) -> Self {
        Self { fetcher }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgramQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/program", get(program))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "OK".to_string(),
    })
}

async fn program(
    State(state): State<AppState>,
    Query(query): Query<ProgramQuery>,
) -> Result<Json<Programme>, ApiError> {
    let from = parse_query_date("from", query.from.as_deref())?;
    let to = parse_query_date("to", query.to.as_deref())?;
    let range = DateRange::new(from, to).map_err(scraper_error)?;

    log::info!(
        "Scraping programme {} – {} ({} day(s))",
        range.start(),
        range.end(),
        range.days()
    );

    let programme = state
        .fetcher
        .fetch_programme(range)
        .await
        .inspect_err(|e| log::error!("Failed to fetch programme: {e}"))
        .map_err(scraper_error)?;

    log::info!(
        "Done: {} screening(s) across {} series",
        programme.screenings.len(),
        programme.series.len()
    );
    Ok(Json(programme))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

fn parse_query_date(name: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| bad_request(format!("Missing '{}' date", name)))?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        bad_request(format!(
            "Invalid '{}' date '{}', expected YYYY-MM-DD: {}",
            name, value, e
        ))
    })
}

fn scraper_error(error: ScraperError) -> ApiError {
    let status = match error {
        ScraperError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
        ScraperError::Fetch(_) | ScraperError::Parse(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
