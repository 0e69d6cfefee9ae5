use std::sync::Arc;

use concierge_core::models::{Language, Message, MessageRole, ReservationView, SegmentView, SessionState};
use concierge_core::providers::LanguageModel;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::intent::{AssistAction, Intent, IntentResult};
use crate::knowledge::knowledge_context;
use crate::rules::{detect_spanish, RuleEngine};
use crate::summary::{fallback_change_summary, fallback_trip_summary, ChangeSummary, TripSummary};

const HISTORY_WINDOW: usize = 6;

const SYSTEM_PROMPT: &str = r#"You are the American Airlines voice assistant ("AA Assistant") helping elderly passengers manage their trips.

Speak the passenger's language: answer in Spanish when they speak Spanish (formal "usted"), otherwise in English.
Be patient, warm and brief: at most three short sentences, one question at a time.
Confirm before changing anything. Read back dates, times and flight numbers. Use 12-hour times with AM/PM and spell out months.
Passengers may spell codes letter by letter or use the phonetic alphabet.

Answer with a single JSON object and nothing else:
{
  "reply": "what to say to the passenger",
  "intent": "greeting | new_booking | rebooking | change_flight | lookup_reservation | check_status | confirm_action | cancel_action | need_help | family_help | request_agent | unclear",
  "entities": {
    "confirmation_code": "", "date": "", "city": "", "origin": "", "destination": "",
    "flight_number": "", "travelers": "", "round_trip": "", "return_date": "",
    "first_name": "", "last_name": ""
  },
  "action": "none | lookup | ask_origin | ask_destination | ask_date | ask_travelers | show_options | confirm_booking | confirm_change | complete",
  "detected_language": "en | es"
}"#;

/// Everything the classifier sees about the current turn.
pub struct IntentRequest<'a> {
    pub message: &'a str,
    pub state: SessionState,
    pub reservation: Option<&'a ReservationView>,
    pub history: &'a [Message],
    pub language_hint: Option<Language>,
}

#[derive(Deserialize)]
struct ModelReply {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    intent: Intent,
    #[serde(default)]
    entities: Value,
    #[serde(default)]
    action: AssistAction,
    #[serde(default)]
    detected_language: Option<String>,
}

/// Intent detection and summaries, backed by a language model when one is
/// configured and by keyword rules and templates otherwise.
pub struct IntentService {
    model: Option<Arc<dyn LanguageModel>>,
    rules: RuleEngine,
}

impl IntentService {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model, rules: RuleEngine::default() }
    }

    /// Rules only.
    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn interpret(&self, request: &IntentRequest<'_>) -> IntentResult {
        let Some(model) = &self.model else {
            return self.rules.classify(request.message, request.state);
        };

        let prompt = build_intent_prompt(request);
        debug!(state = %request.state, "Classifying message with language model");

        match ask_json::<ModelReply>(model.as_ref(), &prompt).await {
            Some(parsed) => {
                let language = parsed
                    .detected_language
                    .as_deref()
                    .map(Language::from_code)
                    .unwrap_or_else(|| {
                        if detect_spanish(request.message) { Language::Es } else { Language::En }
                    });
                IntentResult {
                    reply: parsed
                        .reply
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| "I'm sorry, I didn't understand that.".to_string()),
                    intent: parsed.intent,
                    entities: if parsed.entities.is_object() { parsed.entities } else { Value::Object(Default::default()) },
                    action: parsed.action,
                    detected_language: language,
                }
            }
            None => self.rules.classify(request.message, request.state),
        }
    }

    pub async fn trip_summary(&self, reservation: &ReservationView, language: Language) -> TripSummary {
        if let Some(model) = &self.model {
            let prompt = format!(
                "Write a friendly trip summary for an elderly passenger in {}.\n\
                 Use city names, a friendly date and time, the seat, and spell out the confirmation code letter by letter.\n\
                 Reservation:\n{}\n\n\
                 Answer with JSON only: {{\"summary\": \"...\", \"summary_short\": \"one sentence\"}}",
                language_name(language),
                pretty(reservation),
            );
            if let Some(summary) = ask_json::<TripSummary>(model.as_ref(), &prompt).await {
                return summary;
            }
        }
        fallback_trip_summary(reservation, language)
    }

    pub async fn change_summary(
        &self,
        original: &SegmentView,
        new: &SegmentView,
        language: Language,
    ) -> ChangeSummary {
        if let Some(model) = &self.model {
            let prompt = format!(
                "Explain a flight change to an elderly passenger in {}. Be reassuring and say clearly what changed.\n\
                 Original flight:\n{}\n\nNew flight:\n{}\n\n\
                 Answer with JSON only: {{\"summary\": \"...\", \"changes\": [\"...\"]}}",
                language_name(language),
                pretty(original),
                pretty(new),
            );
            if let Some(summary) = ask_json::<ChangeSummary>(model.as_ref(), &prompt).await {
                return summary;
            }
        }
        fallback_change_summary(original, new, language)
    }
}

fn language_name(language: Language) -> &'static str {
    if language.is_spanish() { "Spanish" } else { "English" }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn build_intent_prompt(request: &IntentRequest<'_>) -> String {
    let mut parts = vec![
        SYSTEM_PROMPT.to_string(),
        format!("KNOWLEDGE BASE (use it for policy, service and airport questions):\n{}", knowledge_context()),
    ];

    if let Some(hint) = request.language_hint {
        parts.push(format!("LANGUAGE HINT: the passenger previously spoke {}", hint));
    }
    if let Some(reservation) = request.reservation {
        parts.push(format!("CURRENT RESERVATION:\n{}", pretty(reservation)));
    }
    parts.push(format!("CURRENT STATE: {}", request.state));

    if !request.history.is_empty() {
        let start = request.history.len().saturating_sub(HISTORY_WINDOW);
        let lines: Vec<String> = request.history[start..]
            .iter()
            .map(|m| {
                let speaker = if m.role == MessageRole::User { "User" } else { "Assistant" };
                format!("{}: {}", speaker, m.content)
            })
            .collect();
        parts.push(format!("CONVERSATION HISTORY:\n{}", lines.join("\n")));
    }

    parts.push(format!("USER JUST SAID: \"{}\"", request.message));
    parts.push("Respond with JSON only:".to_string());
    parts.join("\n\n")
}

/// Models like to wrap JSON in markdown fences.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

async fn ask_json<T: DeserializeOwned>(model: &dyn LanguageModel, prompt: &str) -> Option<T> {
    let raw = match model.generate(prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Language model unavailable, using fallback");
            return None;
        }
    };

    match serde_json::from_str::<T>(strip_code_fences(&raw)) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(error = %e, "Language model returned invalid JSON, using fallback");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_core::providers::{ProviderError, ProviderResult};
    use uuid::Uuid;

    struct CannedModel(Result<String, ()>);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
            self.0.clone().map_err(|_| ProviderError::Transport {
                provider: "test",
                message: "offline".to_string(),
            })
        }
    }

    fn request<'a>(message: &'a str, history: &'a [Message]) -> IntentRequest<'a> {
        IntentRequest {
            message,
            state: SessionState::Viewing,
            reservation: None,
            history,
            language_hint: None,
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_model_reply_is_used() {
        let reply = r#"```json
{"reply": "Claro que sí.", "intent": "change_flight", "entities": {"date": "mañana"}, "action": "ask_date", "detected_language": "es"}
```"#;
        let service = IntentService::new(Some(Arc::new(CannedModel(Ok(reply.to_string())))));
        let result = service.interpret(&request("quiero cambiar mi vuelo", &[])).await;

        assert_eq!(result.intent, Intent::ChangeFlight);
        assert_eq!(result.action, AssistAction::AskDate);
        assert_eq!(result.detected_language, Language::Es);
        assert_eq!(result.entity("date"), Some("mañana"));
    }

    #[tokio::test]
    async fn test_falls_back_to_rules() {
        let broken = IntentService::new(Some(Arc::new(CannedModel(Ok("not json".to_string())))));
        let result = broken.interpret(&request("I want to change my flight", &[])).await;
        assert_eq!(result.intent, Intent::ChangeFlight);

        let offline = IntentService::new(Some(Arc::new(CannedModel(Err(())))));
        let result = offline.interpret(&request("connect me to an agent", &[])).await;
        assert_eq!(result.intent, Intent::RequestAgent);
    }

    #[test]
    fn test_prompt_keeps_last_six_messages() {
        let session_id = Uuid::new_v4();
        let history: Vec<Message> = (0..8)
            .map(|i| Message::new(session_id, MessageRole::User, format!("turn {}", i)))
            .collect();
        let prompt = build_intent_prompt(&request("hello", &history));

        assert!(!prompt.contains("turn 1\n"));
        assert!(prompt.contains("User: turn 2"));
        assert!(prompt.contains("User: turn 7"));
        assert!(prompt.contains("CURRENT STATE: viewing"));
    }

    #[test]
    fn test_prompt_carries_knowledge_base() {
        let prompt = build_intent_prompt(&request("where is the Admirals Club at DFW?", &[]));
        assert!(prompt.contains("KNOWLEDGE BASE"));
        assert!(prompt.contains("Dallas/Fort Worth International (DFW)"));
        assert!(prompt.contains("- Wheelchair assistance:"));
    }
}
