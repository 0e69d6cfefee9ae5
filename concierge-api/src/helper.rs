use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use concierge_core::models::{Message, ReservationView};
use concierge_trip::family::{ActionHistoryItem, ActionInfo};
use concierge_trip::{ActionOutcome, FamilyActions, HelperLink, HelperLinks};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteActionRequest {
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub action_data: Value,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct HelperSessionResponse {
    pub session: Value,
    pub reservation: Option<ReservationView>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct AvailableActionsResponse {
    pub actions: Vec<ActionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ActionHistoryResponse {
    pub actions: Vec<ActionHistoryItem>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/helper/create-link", post(create_helper_link))
        .route("/helper/{link_id}", get(get_helper_session))
        .route("/helper/{link_id}/suggest", post(send_helper_suggestion))
        .route("/helper/{link_id}/email", post(register_helper_email))
        .route("/helper/{link_id}/events", get(helper_events))
        .route("/helper/{link_id}/actions", get(available_actions).post(execute_action))
        .route("/helper/{link_id}/actions/history", get(action_history))
}

// ============================================================================
// Helper links
// ============================================================================

/// POST /api/helper/create-link
async fn create_helper_link(
    State(state): State<AppState>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<Json<HelperLink>, AppError> {
    let session_id = req.session_id.ok_or_else(|| AppError::validation("session_id is required"))?;
    Ok(Json(HelperLinks::new(state.trip.clone()).create_link(session_id).await?))
}

/// GET /api/helper/{link_id}
async fn get_helper_session(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<Json<HelperSessionResponse>, AppError> {
    let view = HelperLinks::new(state.trip.clone()).view(&link_id).await?;
    Ok(Json(HelperSessionResponse {
        session: json!({
            "id": view.id,
            "state": view.state,
            "helper_link": view.helper_link,
            "created_at": view.created_at,
            "expires_at": view.expires_at,
        }),
        reservation: view.reservation,
        messages: view.messages,
    }))
}

/// POST /api/helper/{link_id}/suggest
async fn send_helper_suggestion(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let message = HelperLinks::new(state.trip.clone()).suggest(&link_id, &req.message).await?;
    Ok(Json(SuggestionResponse { success: true, message }))
}

/// POST /api/helper/{link_id}/email
async fn register_helper_email(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>, AppError> {
    HelperLinks::new(state.trip.clone()).register_email(&link_id, &req.email).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/helper/{link_id}/events
///
/// Server-sent events for everything that happens to the linked session.
async fn helper_events(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (session_id, rx) = HelperLinks::new(state.trip.clone()).subscribe(&link_id).await?;

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.concerns_session(session_id) => match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                warn!("Failed to encode session event: {}", e);
                None
            }
        },
        Ok(_) => None,
        Err(e) => {
            warn!(%session_id, "Helper event stream lagged: {}", e);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// Family actions
// ============================================================================

/// GET /api/helper/{link_id}/actions
async fn available_actions(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<Json<AvailableActionsResponse>, AppError> {
    let actions = FamilyActions::new(state.trip.clone()).available(&link_id).await?;
    Ok(Json(AvailableActionsResponse { actions }))
}

/// POST /api/helper/{link_id}/actions
async fn execute_action(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(req): Json<ExecuteActionRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    if req.action_type.trim().is_empty() {
        return Err(AppError::validation("action_type is required"));
    }
    let outcome = FamilyActions::new(state.trip.clone())
        .execute(&link_id, req.action_type.trim(), &req.action_data, &req.notes)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/helper/{link_id}/actions/history
async fn action_history(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<Json<ActionHistoryResponse>, AppError> {
    let actions = FamilyActions::new(state.trip.clone()).history(&link_id).await?;
    Ok(Json(ActionHistoryResponse { actions }))
}
