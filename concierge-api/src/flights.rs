use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use concierge_core::search::{AirportInfo, FlightOption, FlightQuery};
use concierge_trip::{DisruptionManager, DisruptionReport, FlightCatalog, StatusUpdate};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub date: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(rename = "flightNumber", alias = "flight_number")]
    pub flight_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AirportQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlternativesResponse {
    pub flights: Vec<FlightOption>,
}

#[derive(Debug, Serialize)]
pub struct FlightListResponse {
    pub flights: Vec<FlightOption>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub flights: Vec<FlightOption>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AirportResponse {
    One(AirportInfo),
    All(Vec<AirportInfo>),
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights", get(list_flights))
        .route("/flights/alternatives", get(alternative_flights))
        .route("/flights/search", get(search_flights))
        .route("/flights/{flight_id}/status", post(update_flight_status))
        .route("/airports", get(get_airports))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date: {} (expected YYYY-MM-DD)", raw)))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// GET /api/flights/alternatives
async fn alternative_flights(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<AlternativesResponse>, AppError> {
    let (Some(origin), Some(destination), Some(date)) =
        (present(&query.origin), present(&query.destination), present(&query.date))
    else {
        return Err(AppError::validation("origin, destination, and date are required"));
    };
    let date = parse_date(date)?;
    let flights = FlightCatalog::new(state.trip.clone()).alternatives(origin, destination, date).await;
    Ok(Json(AlternativesResponse { flights }))
}

/// GET /api/flights
async fn list_flights(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FlightListResponse>, AppError> {
    let date = present(&query.date)
        .ok_or_else(|| AppError::validation("date parameter is required (YYYY-MM-DD format)"))?;
    let date = parse_date(date)?;
    let catalog = FlightCatalog::new(state.trip.clone());

    let flights = match (present(&query.origin), present(&query.destination)) {
        (Some(origin), Some(destination)) => catalog.alternatives(origin, destination, date).await,
        (origin, destination) => {
            let query = FlightQuery {
                date,
                origin: origin.map(str::to_uppercase),
                destination: destination.map(str::to_uppercase),
                flight_number: present(&query.flight_number).map(str::to_string),
            };
            let bare = query.bare_flight_number();
            catalog
                .list(&query)
                .await
                .into_iter()
                .filter(|f| query.origin.as_ref().is_none_or(|o| f.origin.eq_ignore_ascii_case(o)))
                .filter(|f| query.destination.as_ref().is_none_or(|d| f.destination.eq_ignore_ascii_case(d)))
                .filter(|f| bare.as_ref().is_none_or(|n| f.flight_number.contains(n.as_str())))
                .collect()
        }
    };

    Ok(Json(FlightListResponse { count: flights.len(), flights }))
}

/// GET /api/flights/search
async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let (Some(origin), Some(destination)) = (present(&query.origin), present(&query.destination)) else {
        return Err(AppError::validation("origin and destination parameters are required"));
    };
    let date = match present(&query.date) {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive() + Duration::days(1),
    };
    let origin = origin.to_uppercase();
    let destination = destination.to_uppercase();

    let flights = FlightCatalog::new(state.trip.clone()).alternatives(&origin, &destination, date).await;
    Ok(Json(SearchResponse { origin, destination, date, count: flights.len(), flights }))
}

/// GET /api/airports
async fn get_airports(
    State(state): State<AppState>,
    Query(query): Query<AirportQuery>,
) -> Result<Json<AirportResponse>, AppError> {
    let catalog = FlightCatalog::new(state.trip.clone());
    match present(&query.code) {
        Some(code) => catalog
            .airport(code)
            .await
            .map(|a| Json(AirportResponse::One(a)))
            .ok_or_else(|| AppError::not_found(format!("Airport not found: {}", code))),
        None => Ok(Json(AirportResponse::All(catalog.airports().await))),
    }
}

/// POST /api/flights/{flight_id}/status
async fn update_flight_status(
    State(state): State<AppState>,
    Path(flight_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<DisruptionReport>, AppError> {
    let report = DisruptionManager::new(state.trip.clone()).update_status(&flight_id, update).await?;
    Ok(Json(report))
}
