use std::str::FromStr;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use concierge_core::models::AlertType;
use concierge_trip::journey::{self, DfwWaypoint, JourneySnapshot, DFW_WAYPOINTS};
use concierge_trip::location::{GeofenceStatus, PositionView};
use concierge_trip::{geofence_status, AlertOutcome, LocationAlerts, LocationMetrics, LocationTracker, LocationUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub session_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub session_id: Uuid,
    pub alert_type: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertOutcome>,
}

#[derive(Debug, Serialize)]
pub struct CurrentLocationResponse {
    pub session_id: Uuid,
    pub location: Option<PositionView>,
}

#[derive(Debug, Deserialize)]
pub struct GeofenceQuery {
    pub lat: f64,
    pub lng: f64,
    pub airport: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JourneyQuery {
    pub progress: Option<f64>,
    pub elapsed_seconds: Option<u64>,
    pub duration_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct WaypointsResponse {
    pub waypoints: &'static [DfwWaypoint],
    pub total_distance_m: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/location/update", post(update_location))
        .route("/location/geofence", get(check_geofence))
        .route("/location/alerts", post(send_alert))
        .route("/location/alerts/{alert_id}/acknowledge", post(acknowledge_alert))
        .route("/location/{session_id}", get(current_location))
        .route("/location/{session_id}/metrics", get(location_metrics))
        .route("/journey/dfw", get(journey_snapshot))
        .route("/journey/dfw/waypoints", get(journey_waypoints))
}

/// POST /api/location/update
async fn update_location(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<LocationUpdate>, AppError> {
    let update = LocationTracker::new(state.trip.clone())
        .update(req.session_id, req.latitude, req.longitude, req.accuracy)
        .await?;
    if let Some(alert) = &update.alert {
        state.metrics.record_alert(alert.alert_type.as_str());
    }
    Ok(Json(update))
}

/// GET /api/location/{session_id}
async fn current_location(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CurrentLocationResponse>, AppError> {
    let location = LocationTracker::new(state.trip.clone()).current(session_id).await?;
    Ok(Json(CurrentLocationResponse { session_id, location }))
}

/// GET /api/location/{session_id}/metrics
async fn location_metrics(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<LocationMetrics>, AppError> {
    Ok(Json(LocationTracker::new(state.trip.clone()).metrics(session_id).await?))
}

/// POST /api/location/alerts
async fn send_alert(
    State(state): State<AppState>,
    Json(req): Json<AlertRequest>,
) -> Result<Json<AlertResponse>, AppError> {
    let alert_type = AlertType::from_str(req.alert_type.trim())
        .map_err(|_| AppError::validation(format!("Unknown alert type: {}", req.alert_type)))?;
    let alert = LocationAlerts::new(state.trip.clone()).send(req.session_id, alert_type, req.force).await?;
    if let Some(outcome) = &alert {
        state.metrics.record_alert(outcome.alert_type.as_str());
    }
    Ok(Json(AlertResponse { sent: alert.is_some(), alert }))
}

/// POST /api/location/alerts/{alert_id}/acknowledge
async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !LocationAlerts::new(state.trip.clone()).acknowledge(alert_id).await? {
        return Err(AppError::not_found("Alert not found"));
    }
    Ok(Json(json!({ "success": true, "alert_id": alert_id })))
}

/// GET /api/location/geofence
async fn check_geofence(Query(query): Query<GeofenceQuery>) -> Result<Json<GeofenceStatus>, AppError> {
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(AppError::validation("Invalid coordinates"));
    }
    Ok(Json(geofence_status(query.lat, query.lng, query.airport.as_deref())))
}

/// GET /api/journey/dfw
///
/// Either `progress` (0..1) or `elapsed_seconds` of a walk lasting `duration_seconds`.
async fn journey_snapshot(Query(query): Query<JourneyQuery>) -> Json<JourneySnapshot> {
    let progress = match (query.progress, query.elapsed_seconds, query.duration_seconds) {
        (Some(progress), _, _) => progress,
        (None, Some(elapsed), Some(duration)) => {
            journey::progress_of(Duration::from_secs(elapsed), Duration::from_secs(duration))
        }
        _ => 0.0,
    };
    Json(journey::snapshot(progress))
}

/// GET /api/journey/dfw/waypoints
async fn journey_waypoints() -> Json<WaypointsResponse> {
    Json(WaypointsResponse {
        waypoints: DFW_WAYPOINTS,
        total_distance_m: journey::total_length_m().round() as i64,
    })
}
