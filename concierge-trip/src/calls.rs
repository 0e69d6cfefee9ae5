//! Retell phone-call webhooks: call lifecycle events and mid-call function calls.

use chrono::Duration;
use concierge_core::models::{Message, MessageRole, Session};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};

use crate::context::TripContext;
use crate::error::TripResult;
use crate::tools::VoiceTools;

type HmacSha256 = Hmac<Sha256>;

/// Checks the hex HMAC-SHA256 of the raw body. Always false without a key.
pub fn verify_signature(api_key: &str, body: &[u8], signature: &str) -> bool {
    if api_key.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(api_key.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Clone)]
pub struct CallEvents {
    ctx: TripContext,
}

impl CallEvents {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, event: &str, data: &Value) -> TripResult<Value> {
        match event {
            "call_started" => self.call_started(data).await,
            "call_ended" => self.call_ended(data).await,
            "call_analyzed" => self.call_analyzed(data).await,
            "function_call" => self.function_call(data).await,
            other => {
                warn!(event = %other, "Ignoring unknown call event");
                Ok(json!({ "status": "ignored", "event_type": other }))
            }
        }
    }

    async fn call_started(&self, data: &Value) -> TripResult<Value> {
        let call_id = data.get("call_id").and_then(Value::as_str).unwrap_or_default();
        let from_number = data.get("from_number").cloned().unwrap_or(Value::Null);
        if !call_id.is_empty() {
            if let Some(existing) = self.ctx.store.find_by_call_id(call_id).await? {
                info!(%call_id, session_id = %existing.id, "Repeated call start");
                return Ok(json!({ "status": "success", "session_id": existing.id, "call_id": call_id }));
            }
        }
        info!(%call_id, "Phone call started");

        let mut session = Session::new(Duration::minutes(self.ctx.rules.call_session_expiry_minutes));
        if !call_id.is_empty() {
            session.call_id = Some(call_id.to_string());
        }
        session.set_context("retell_call_id", json!(call_id));
        session.set_context("phone_number", from_number);
        session.set_context("source", json!("retell_phone"));
        self.ctx.store.save_session(&session).await?;

        Ok(json!({ "status": "success", "session_id": session.id, "call_id": call_id }))
    }

    async fn call_ended(&self, data: &Value) -> TripResult<Value> {
        let Some(mut session) = self.call_session(data).await? else {
            return Ok(session_not_found());
        };
        if session.context_value("call_ended") == Some(&json!(true)) {
            info!(session_id = %session.id, "Repeated call end");
            return Ok(json!({ "status": "success", "session_id": session.id }));
        }
        let duration_ms = data.get("duration_ms").and_then(Value::as_i64).unwrap_or(0);
        let transcript = data.get("transcript").cloned().unwrap_or_else(|| json!([]));
        info!(session_id = %session.id, duration_ms, "Phone call ended");

        session.set_context("call_ended", json!(true));
        session.set_context("duration_ms", json!(duration_ms));
        session.set_context("transcript", transcript.clone());
        self.ctx.store.save_session(&session).await?;

        for entry in transcript.as_array().into_iter().flatten() {
            let role = match entry.get("role").and_then(Value::as_str) {
                Some("user") => MessageRole::User,
                _ => MessageRole::Assistant,
            };
            let content = entry.get("content").and_then(Value::as_str).unwrap_or_default();
            self.ctx.append(&Message::new(session.id, role, content.to_string())).await?;
        }

        Ok(json!({ "status": "success", "session_id": session.id }))
    }

    async fn call_analyzed(&self, data: &Value) -> TripResult<Value> {
        let Some(mut session) = self.call_session(data).await? else {
            return Ok(session_not_found());
        };
        session.set_context("analysis", data.get("call_analysis").cloned().unwrap_or_else(|| json!({})));
        self.ctx.store.save_session(&session).await?;
        Ok(json!({ "status": "success" }))
    }

    async fn function_call(&self, data: &Value) -> TripResult<Value> {
        let name = data.get("function_name").and_then(Value::as_str).unwrap_or_default();
        let arguments = data.get("arguments").cloned().unwrap_or_else(|| json!({}));

        Ok(match VoiceTools::new(self.ctx.clone()).call(name, &arguments).await? {
            Some(result) => json!({ "status": "success", "function_name": name, "result": result }),
            None => json!({ "status": "error", "message": format!("Unknown function: {}", name) }),
        })
    }

    async fn call_session(&self, data: &Value) -> TripResult<Option<Session>> {
        let call_id = data.get("call_id").and_then(Value::as_str).unwrap_or_default();
        if call_id.is_empty() {
            return Ok(None);
        }
        let session = self.ctx.store.find_by_call_id(call_id).await?;
        if session.is_none() {
            warn!(%call_id, "No session for call");
        }
        Ok(session)
    }
}

fn session_not_found() -> Value {
    json!({ "status": "error", "message": "Session not found" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;

    #[test]
    fn test_signature() {
        let mut mac = HmacSha256::new_from_slice(b"key_123").unwrap();
        mac.update(b"{\"event\":\"call_started\"}");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_signature("key_123", b"{\"event\":\"call_started\"}", &signature));
        assert!(!verify_signature("key_123", b"{\"event\":\"call_ended\"}", &signature));
        assert!(!verify_signature("", b"{\"event\":\"call_started\"}", &signature));
        assert!(!verify_signature("key_123", b"{}", "not-hex"));
    }

    #[tokio::test]
    async fn test_call_lifecycle() {
        let ctx = context();
        let events = CallEvents::new(ctx.clone());

        let started = events
            .handle("call_started", &json!({ "call_id": "call_9", "from_number": "+12145550123" }))
            .await
            .unwrap();
        assert_eq!(started["status"], "success");
        let session = ctx.store.find_by_call_id("call_9").await.unwrap().unwrap();
        assert_eq!(started["session_id"], json!(session.id));
        assert_eq!(session.context_str("source"), Some("retell_phone"));

        let ended = events
            .handle(
                "call_ended",
                &json!({
                    "call_id": "call_9",
                    "duration_ms": 61000,
                    "transcript": [
                        { "role": "agent", "content": "Hello, how can I help?" },
                        { "role": "user", "content": "I need to change my flight" },
                    ],
                }),
            )
            .await
            .unwrap();
        assert_eq!(ended["status"], "success");

        let messages = ctx.store.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::Assistant);
        assert_eq!(messages[1].role, MessageRole::User);

        events
            .handle("call_analyzed", &json!({ "call_id": "call_9", "call_analysis": { "call_successful": true } }))
            .await
            .unwrap();
        let session = ctx.store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(session.context_value("duration_ms"), Some(&json!(61000)));
        assert_eq!(session.context_value("analysis").unwrap()["call_successful"], true);
    }

    #[tokio::test]
    async fn test_redelivered_call_events() {
        let ctx = context();
        let events = CallEvents::new(ctx.clone());
        let start = json!({ "call_id": "call_7" });

        let first = events.handle("call_started", &start).await.unwrap();
        let again = events.handle("call_started", &start).await.unwrap();
        assert_eq!(again["status"], "success");
        assert_eq!(again["session_id"], first["session_id"]);

        let end = json!({
            "call_id": "call_7",
            "transcript": [{ "role": "user", "content": "Thanks, bye" }],
        });
        events.handle("call_ended", &end).await.unwrap();
        let again = events.handle("call_ended", &end).await.unwrap();
        assert_eq!(again["session_id"], first["session_id"]);

        let session = ctx.store.find_by_call_id("call_7").await.unwrap().unwrap();
        assert_eq!(ctx.store.list_messages(session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_calls_and_events() {
        let events = CallEvents::new(context());

        let missing = events.handle("call_ended", &json!({ "call_id": "nobody" })).await.unwrap();
        assert_eq!(missing, json!({ "status": "error", "message": "Session not found" }));

        let ignored = events.handle("call_transferred", &json!({})).await.unwrap();
        assert_eq!(ignored, json!({ "status": "ignored", "event_type": "call_transferred" }));

        let unknown = events.handle("function_call", &json!({ "function_name": "order_pizza" })).await.unwrap();
        assert_eq!(unknown["message"], "Unknown function: order_pizza");

        let lookup = events
            .handle(
                "function_call",
                &json!({ "function_name": "lookup_reservation", "arguments": { "confirmation_code": "SENIOR2" } }),
            )
            .await
            .unwrap();
        assert_eq!(lookup["status"], "success");
        assert_eq!(lookup["result"]["passenger_name"], "William Thompson");
    }
}
