use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use concierge_core::models::{HandoffDossier, HandoffStatus, Message};
use concierge_trip::HandoffDesk;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{agent_auth_middleware, AgentClaims};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct HandoffRequest {
    pub session_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AcceptRequest {
    pub agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResolveRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DossierList {
    pub count: usize,
    pub dossiers: Vec<HandoffDossier>,
}

/// Passenger-facing request plus the agent console, which sits behind the agent token.
pub fn routes(state: AppState) -> Router<AppState> {
    let console = Router::new()
        .route("/handoff", get(list_dossiers))
        .route("/handoff/{id}", get(get_dossier))
        .route("/handoff/{id}/accept", post(accept_dossier))
        .route("/handoff/{id}/reply", post(reply_to_passenger))
        .route("/handoff/{id}/resolve", post(resolve_dossier))
        .route_layer(middleware::from_fn_with_state(state, agent_auth_middleware));

    Router::new().route("/handoff/request", post(request_handoff)).merge(console)
}

/// POST /api/handoff/request
async fn request_handoff(
    State(state): State<AppState>,
    Json(req): Json<HandoffRequest>,
) -> Result<Json<HandoffDossier>, AppError> {
    Ok(Json(HandoffDesk::new(state.trip.clone()).request(req.session_id, &req.reason).await?))
}

/// GET /api/handoff
async fn list_dossiers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DossierList>, AppError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            HandoffStatus::from_str(raw).map_err(|_| AppError::validation(format!("Unknown status: {}", raw)))?,
        ),
        None => None,
    };
    let dossiers = HandoffDesk::new(state.trip.clone()).list(status).await?;
    Ok(Json(DossierList { count: dossiers.len(), dossiers }))
}

/// GET /api/handoff/{id}
async fn get_dossier(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<HandoffDossier>, AppError> {
    Ok(Json(HandoffDesk::new(state.trip.clone()).get(id).await?))
}

/// POST /api/handoff/{id}/accept
async fn accept_dossier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Option<Extension<AgentClaims>>,
    body: Option<Json<AcceptRequest>>,
) -> Result<Json<HandoffDossier>, AppError> {
    let agent = claims
        .map(|Extension(c)| c.sub)
        .or_else(|| body.and_then(|Json(b)| b.agent))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "agent".to_string());
    Ok(Json(HandoffDesk::new(state.trip.clone()).accept(id, &agent).await?))
}

/// POST /api/handoff/{id}/reply
async fn reply_to_passenger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Message>, AppError> {
    Ok(Json(HandoffDesk::new(state.trip.clone()).reply(id, &req.message).await?))
}

/// POST /api/handoff/{id}/resolve
async fn resolve_dossier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ResolveRequest>>,
) -> Result<Json<HandoffDossier>, AppError> {
    let notes = body.and_then(|Json(b)| b.notes);
    Ok(Json(HandoffDesk::new(state.trip.clone()).resolve(id, notes.as_deref()).await?))
}
