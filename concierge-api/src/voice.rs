use axum::{extract::State, routing::post, Json, Router};
use concierge_core::models::Language;
use concierge_trip::{SpeechResult, VoiceService};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/voice/synthesize", post(synthesize_voice))
}

/// POST /api/voice/synthesize
async fn synthesize_voice(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Json<SpeechResult>, AppError> {
    let language = req.language.as_deref().map(Language::from_code).unwrap_or_default();
    Ok(Json(VoiceService::new(state.trip.clone()).synthesize(&req.text, language).await?))
}
