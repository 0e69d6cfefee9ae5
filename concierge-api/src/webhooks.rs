use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use concierge_trip::{verify_signature, CallEvents, VoiceTools};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{error::AppError, state::AppState};

pub const RETELL_SIGNATURE_HEADER: &str = "x-retell-signature";

#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Value,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/retell", post(retell_webhook))
        .route("/webhooks/elevenlabs/tools", post(elevenlabs_tool))
        .route("/webhooks/elevenlabs/agent-prompt", get(elevenlabs_agent_prompt))
}

/// POST /api/webhooks/retell
///
/// Accepts `{event, call}` lifecycle payloads and `{event: "function_call", ...}`
/// or `{name, args}` function calls.
async fn retell_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if let Some(key) = state.auth.retell_api_key.as_deref() {
        let signature = headers
            .get(RETELL_SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(key, &body, signature) {
            warn!("Rejected Retell webhook with a bad signature");
            return Err(AppError::AuthenticationError("Invalid signature".to_string()));
        }
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|_| AppError::validation("Invalid JSON body"))?;
    let (event, data) = split_event(&payload);
    info!(%event, "Retell webhook");

    Ok(Json(CallEvents::new(state.trip.clone()).handle(&event, &data).await?))
}

/// POST /api/webhooks/elevenlabs/tools
async fn elevenlabs_tool(
    State(state): State<AppState>,
    Json(req): Json<ToolRequest>,
) -> Result<Json<Value>, AppError> {
    let parameters = if req.parameters.is_object() { req.parameters } else { json!({}) };
    Ok(Json(VoiceTools::new(state.trip.clone()).handle_server_tool(&req.tool_name, &parameters).await?))
}

/// GET /api/webhooks/elevenlabs/agent-prompt
///
/// Prompt to paste into the hosted agent's configuration.
async fn elevenlabs_agent_prompt() -> Json<Value> {
    Json(json!({ "prompt": VoiceTools::agent_prompt(), "tools": concierge_trip::tools::TOOL_NAMES }))
}

/// Event name and the object the handler reads its fields from.
fn split_event(payload: &Value) -> (String, Value) {
    if let (Some(name), Some(args)) = (payload.get("name").and_then(Value::as_str), payload.get("args")) {
        let call_id = payload.pointer("/call/call_id").cloned().unwrap_or(Value::Null);
        return (
            "function_call".to_string(),
            json!({ "function_name": name, "arguments": args, "call_id": call_id }),
        );
    }

    let event = payload
        .get("event")
        .or_else(|| payload.get("event_type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = payload
        .get("call")
        .or_else(|| payload.get("data"))
        .cloned()
        .unwrap_or_else(|| payload.clone());
    (event, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_event_shapes() {
        let (event, data) = split_event(&json!({ "event": "call_ended", "call": { "call_id": "c1", "duration_ms": 5 } }));
        assert_eq!(event, "call_ended");
        assert_eq!(data["call_id"], "c1");

        let (event, data) = split_event(&json!({
            "name": "lookup_reservation",
            "args": { "confirmation_code": "DEMO123" },
            "call": { "call_id": "c2" },
        }));
        assert_eq!(event, "function_call");
        assert_eq!(data["function_name"], "lookup_reservation");
        assert_eq!(data["call_id"], "c2");

        let (event, data) = split_event(&json!({ "event_type": "function_call", "function_name": "get_flight_options" }));
        assert_eq!(event, "function_call");
        assert_eq!(data["function_name"], "get_flight_options");
    }
}
