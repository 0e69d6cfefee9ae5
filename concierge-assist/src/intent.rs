use concierge_core::models::Language;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What the passenger is trying to do with their last utterance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    NewBooking,
    Rebooking,
    ChangeFlight,
    LookupReservation,
    CheckStatus,
    ConfirmAction,
    CancelAction,
    NeedHelp,
    FamilyHelp,
    RequestAgent,
    #[default]
    #[serde(other)]
    Unclear,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::NewBooking => "new_booking",
            Intent::Rebooking => "rebooking",
            Intent::ChangeFlight => "change_flight",
            Intent::LookupReservation => "lookup_reservation",
            Intent::CheckStatus => "check_status",
            Intent::ConfirmAction => "confirm_action",
            Intent::CancelAction => "cancel_action",
            Intent::NeedHelp => "need_help",
            Intent::FamilyHelp => "family_help",
            Intent::RequestAgent => "request_agent",
            Intent::Unclear => "unclear",
        }
    }

    /// Rebooking is how the model sometimes labels a change request.
    pub fn wants_change(&self) -> bool {
        matches!(self, Intent::ChangeFlight | Intent::Rebooking)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next step the assistant proposes, as reported by the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssistAction {
    Lookup,
    AskOrigin,
    AskDestination,
    AskDate,
    AskTravelers,
    ShowOptions,
    ConfirmBooking,
    ConfirmChange,
    Complete,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentResult {
    pub reply: String,
    pub intent: Intent,
    /// Free-form entities (confirmation_code, date, origin, destination, ...).
    pub entities: Value,
    pub action: AssistAction,
    pub detected_language: Language,
}

impl IntentResult {
    pub fn new(reply: impl Into<String>, intent: Intent, language: Language) -> Self {
        Self {
            reply: reply.into(),
            intent,
            entities: json!({}),
            action: AssistAction::None,
            detected_language: language,
        }
    }

    pub fn with_action(mut self, action: AssistAction) -> Self {
        self.action = action;
        self
    }

    pub fn entity(&self, key: &str) -> Option<&str> {
        self.entities
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_intent_is_unclear() {
        let intent: Intent = serde_json::from_str("\"book_hotel\"").unwrap();
        assert_eq!(intent, Intent::Unclear);
        let intent: Intent = serde_json::from_str("\"family_help\"").unwrap();
        assert_eq!(intent, Intent::FamilyHelp);
    }

    #[test]
    fn test_unknown_action_is_none() {
        let action: AssistAction = serde_json::from_str("\"dance\"").unwrap();
        assert_eq!(action, AssistAction::None);
        let action: AssistAction = serde_json::from_str("\"confirm_change\"").unwrap();
        assert_eq!(action, AssistAction::ConfirmChange);
        assert_eq!(serde_json::to_string(&AssistAction::default()).unwrap(), "\"none\"");
    }

    #[test]
    fn test_entity_lookup_skips_blanks() {
        let mut result = IntentResult::new("ok", Intent::LookupReservation, Language::En);
        result.entities = json!({"confirmation_code": "DEMO123", "date": "  "});
        assert_eq!(result.entity("confirmation_code"), Some("DEMO123"));
        assert_eq!(result.entity("date"), None);
        assert_eq!(result.entity("city"), None);
    }
}
