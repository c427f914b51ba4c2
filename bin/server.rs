// Holiday Data Service - Read API server
//
// Serves the imported holiday data over HTTP. The store is loaded once
// into an immutable snapshot; every handler reads from that snapshot
// without locking, so requests execute in parallel freely. All mutation
// happens through the importer CLI, never through this surface.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use holiday_data::responses::{
    CountryResponse, HolidayByDateResponse, HolidayResponse, LanguageResponse, OUnitResponse,
    StatisticsResponse, SubdivisionResponse,
};
use holiday_data::{
    formats, holidays_by_date, holidays_in_range, ounit_tree, statistics, subdivision_tree,
    HolidayFilter, QueryError, Snapshot, TypeFamily,
};

/// Shared application state: the immutable snapshot
#[derive(Clone)]
struct AppState {
    snapshot: Arc<Snapshot>,
}

/// Output rendering selected by the `format` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    #[default]
    Json,
    Csv,
    Ics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolidaysParams {
    country_iso_code: String,
    valid_from: NaiveDate,
    valid_to: NaiveDate,
    subdivision_code: Option<String>,
    #[serde(rename = "oUnitCode")]
    ounit_code: Option<String>,
    language_iso_code: Option<String>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolidaysByDateParams {
    date: NaiveDate,
    language_iso_code: Option<String>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    language_iso_code: Option<String>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubdivisionsParams {
    country_iso_code: String,
    language_iso_code: Option<String>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OUnitsParams {
    country_iso_code: String,
    subdivision_code: Option<String>,
    language_iso_code: Option<String>,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsParams {
    country_iso_code: String,
    subdivision_code: Option<String>,
    #[serde(rename = "oUnitCode")]
    ounit_code: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /PublicHolidays and /SchoolHolidays
async fn get_holidays(
    family: TypeFamily,
    state: AppState,
    params: HolidaysParams,
) -> Response {
    let region_code = params.subdivision_code.or(params.ounit_code);
    let filter = HolidayFilter::new(&params.country_iso_code, family)
        .with_region(region_code.as_deref());

    let holidays = match holidays_in_range(
        &state.snapshot,
        &filter,
        params.valid_from,
        params.valid_to,
    ) {
        Ok(holidays) => holidays,
        Err(error) => return query_error(error),
    };

    let language = params.language_iso_code.as_deref();
    let responses: Vec<HolidayResponse> = holidays
        .into_iter()
        .map(|h| HolidayResponse::new(&state.snapshot, h, language))
        .collect();

    match params.format {
        OutputFormat::Json => Json(responses).into_response(),
        OutputFormat::Csv => csv_response(formats::holidays_to_csv(&responses)),
        OutputFormat::Ics => ics_response(formats::holidays_to_ics(&responses)),
    }
}

async fn get_public_holidays(
    State(state): State<AppState>,
    Query(params): Query<HolidaysParams>,
) -> Response {
    get_holidays(TypeFamily::Public, state, params).await
}

async fn get_school_holidays(
    State(state): State<AppState>,
    Query(params): Query<HolidaysParams>,
) -> Response {
    get_holidays(TypeFamily::School, state, params).await
}

/// GET /PublicHolidaysByDate and /SchoolHolidaysByDate
async fn get_holidays_by_date(
    family: TypeFamily,
    state: AppState,
    params: HolidaysByDateParams,
) -> Response {
    let holidays = holidays_by_date(&state.snapshot, family, params.date);
    let language = params.language_iso_code.as_deref();
    let responses: Vec<HolidayByDateResponse> = holidays
        .into_iter()
        .map(|h| HolidayByDateResponse::new(&state.snapshot, h, language))
        .collect();

    // The by-date shape has no compact renderings
    Json(responses).into_response()
}

async fn get_public_holidays_by_date(
    State(state): State<AppState>,
    Query(params): Query<HolidaysByDateParams>,
) -> Response {
    get_holidays_by_date(TypeFamily::Public, state, params).await
}

async fn get_school_holidays_by_date(
    State(state): State<AppState>,
    Query(params): Query<HolidaysByDateParams>,
) -> Response {
    get_holidays_by_date(TypeFamily::School, state, params).await
}

/// GET /Countries
async fn get_countries(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let language = params.language_iso_code.as_deref();
    let responses: Vec<CountryResponse> = state
        .snapshot
        .countries
        .iter()
        .map(|c| CountryResponse::new(c, language))
        .collect();

    match params.format {
        OutputFormat::Csv => csv_response(formats::countries_to_csv(&responses)),
        _ => Json(responses).into_response(),
    }
}

/// GET /Languages
async fn get_languages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let language = params.language_iso_code.as_deref();
    let responses: Vec<LanguageResponse> = state
        .snapshot
        .languages
        .iter()
        .map(|l| LanguageResponse::new(l, language))
        .collect();

    match params.format {
        OutputFormat::Csv => csv_response(formats::languages_to_csv(&responses)),
        _ => Json(responses).into_response(),
    }
}

/// GET /Subdivisions
async fn get_subdivisions(
    State(state): State<AppState>,
    Query(params): Query<SubdivisionsParams>,
) -> Response {
    let language = params.language_iso_code.as_deref();
    let tree = subdivision_tree(&state.snapshot, &params.country_iso_code);
    let responses: Vec<SubdivisionResponse> = tree
        .iter()
        .map(|node| SubdivisionResponse::new(node, language))
        .collect();

    match params.format {
        OutputFormat::Csv => csv_response(formats::subdivisions_to_csv(&responses)),
        _ => Json(responses).into_response(),
    }
}

/// GET /OUnits
async fn get_ounits(
    State(state): State<AppState>,
    Query(params): Query<OUnitsParams>,
) -> Response {
    let language = params.language_iso_code.as_deref();
    let tree = ounit_tree(
        &state.snapshot,
        &params.country_iso_code,
        params.subdivision_code.as_deref(),
    );
    let responses: Vec<OUnitResponse> = tree
        .iter()
        .map(|node| OUnitResponse::new(&state.snapshot, node, language))
        .collect();

    match params.format {
        OutputFormat::Csv => csv_response(formats::ounits_to_csv(&responses)),
        _ => Json(responses).into_response(),
    }
}

/// GET /Statistics/PublicHolidays and /Statistics/SchoolHolidays
async fn get_statistics(family: TypeFamily, state: AppState, params: StatisticsParams) -> Response {
    let region_code = params.subdivision_code.or(params.ounit_code);
    let filter = HolidayFilter::new(&params.country_iso_code, family)
        .with_region(region_code.as_deref());
    let stats = statistics(&state.snapshot, &filter);
    Json(StatisticsResponse::from(stats)).into_response()
}

async fn get_public_statistics(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Response {
    get_statistics(TypeFamily::Public, state, params).await
}

async fn get_school_statistics(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Response {
    get_statistics(TypeFamily::School, state, params).await
}

// ============================================================================
// Response helpers
// ============================================================================

fn query_error(error: QueryError) -> Response {
    (StatusCode::BAD_REQUEST, error.to_string()).into_response()
}

fn csv_response(result: anyhow::Result<String>) -> Response {
    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("csv rendering failed: {error:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn ics_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
        body,
    )
        .into_response()
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/PublicHolidays", get(get_public_holidays))
        .route("/SchoolHolidays", get(get_school_holidays))
        .route("/PublicHolidaysByDate", get(get_public_holidays_by_date))
        .route("/SchoolHolidaysByDate", get(get_school_holidays_by_date))
        .route("/Countries", get(get_countries))
        .route("/Languages", get(get_languages))
        .route("/Subdivisions", get(get_subdivisions))
        .route("/OUnits", get(get_ounits))
        .route("/Statistics/PublicHolidays", get(get_public_statistics))
        .route("/Statistics/SchoolHolidays", get(get_school_statistics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let db_file = args.get(1).map(String::as_str).unwrap_or("holidays.db");
    let addr = args.get(2).map(String::as_str).unwrap_or("0.0.0.0:3000");

    // Load the store once; queries never touch the connection again
    let conn = Connection::open(db_file)?;
    let snapshot = Snapshot::load(&conn)?;
    tracing::info!(
        countries = snapshot.countries.len(),
        holidays = snapshot.holidays.len(),
        "snapshot loaded from {db_file}"
    );

    let state = AppState {
        snapshot: Arc::new(snapshot),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("holiday server listening on {addr}");
    axum::serve(listener, router(state)).await?;

    Ok(())
}
