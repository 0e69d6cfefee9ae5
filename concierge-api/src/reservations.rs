use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use concierge_core::models::ReservationView;
use concierge_trip::{Notifier, ReservationService};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub confirmation_code: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub reservation: ReservationView,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRequest {
    pub session_id: Uuid,
    pub reservation_id: Uuid,
    pub new_flight_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    pub success: bool,
    pub new_reservation: ReservationView,
    pub confirmation_message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservation/lookup", get(lookup_reservation))
        .route("/reservation/change", post(change_reservation))
}

/// GET /api/reservation/lookup
async fn lookup_reservation(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    let reservation = ReservationService::new(state.trip.clone())
        .lookup(query.confirmation_code.as_deref(), query.last_name.as_deref(), query.email.as_deref())
        .await?;
    Ok(Json(LookupResponse { reservation: ReservationView::from(&reservation) }))
}

/// POST /api/reservation/change
async fn change_reservation(
    State(state): State<AppState>,
    Json(req): Json<ChangeRequest>,
) -> Result<Json<ChangeResponse>, AppError> {
    let change = ReservationService::new(state.trip.clone())
        .change(req.session_id, req.reservation_id, &req.new_flight_id)
        .await?;
    Notifier::new(state.trip.clone())
        .change_confirmation(&change.reservation, &change.original, &change.new)
        .await;

    Ok(Json(ChangeResponse {
        success: true,
        new_reservation: ReservationView::from(&change.reservation),
        confirmation_message: "Your flight has been changed successfully.".to_string(),
    }))
}
