use std::str::FromStr;

use axum::{extract::State, routing::post, Json, Router};
use concierge_trip::{ReminderKind, ReminderResult, Reminders};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ManualReminderRequest {
    #[serde(default)]
    pub confirmation_code: String,
    pub reminder_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReminderRunResponse {
    pub count: usize,
    pub results: Vec<ReminderResult>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminders/run", post(run_reminders))
        .route("/reminders/send", post(send_reminder))
}

/// Counts each attempt by type and outcome.
pub(crate) fn record(state: &AppState, results: &[ReminderResult]) {
    for result in results {
        state.metrics.record_reminder(result.reminder_type.as_str(), result.status.as_str());
    }
}

/// POST /api/reminders/run
async fn run_reminders(State(state): State<AppState>) -> Result<Json<ReminderRunResponse>, AppError> {
    let results = Reminders::new(state.trip.clone()).run_due().await?;
    record(&state, &results);
    Ok(Json(ReminderRunResponse { count: results.len(), results }))
}

/// POST /api/reminders/send
async fn send_reminder(
    State(state): State<AppState>,
    Json(req): Json<ManualReminderRequest>,
) -> Result<Json<ReminderResult>, AppError> {
    if req.confirmation_code.trim().is_empty() {
        return Err(AppError::validation("confirmation_code is required"));
    }
    let kind = match req.reminder_type.as_deref() {
        Some(raw) => ReminderKind::from_str(raw)?,
        None => ReminderKind::Departure1Hr,
    };
    let result = Reminders::new(state.trip.clone()).send_manual(&req.confirmation_code, kind).await?;
    record(&state, std::slice::from_ref(&result));
    Ok(Json(result))
}
