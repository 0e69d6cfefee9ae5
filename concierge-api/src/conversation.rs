use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use concierge_trip::{ConversationEngine, SessionView, StartReply, TurnReply};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize, Default)]
pub struct StartRequest {
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub transcript: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversation/start", post(start_conversation))
        .route("/conversation/message", post(send_message))
        .route("/conversation/{session_id}", get(get_session))
}

/// POST /api/conversation/start
async fn start_conversation(
    State(state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartReply>, AppError> {
    let session_id = body.and_then(|Json(req)| req.session_id);
    let reply = ConversationEngine::new(state.trip.clone()).start(session_id).await?;
    Ok(Json(reply))
}

/// POST /api/conversation/message
async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnReply>, AppError> {
    let session_id = req
        .session_id
        .ok_or_else(|| AppError::validation("session_id and transcript are required"))?;
    let reply = ConversationEngine::new(state.trip.clone())
        .handle_message(session_id, &req.transcript)
        .await?;
    Ok(Json(reply))
}

/// GET /api/conversation/{session_id}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(ConversationEngine::new(state.trip.clone()).get_session(session_id).await?))
}
