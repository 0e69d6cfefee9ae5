use concierge_core::models::{Language, SessionState};

use crate::intent::{AssistAction, Intent, IntentResult};

/// Words that mark an utterance as Spanish.
const SPANISH_MARKERS: &[&str] = &[
    "hola", "vuelo", "cambiar", "reserva", "ayuda", "gracias", "necesito", "quiero", "por favor",
    "mi", "sí", "señor", "señora", "familia",
];

/// Keyword rule mapping an utterance to an intent with a canned bilingual reply.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    /// Single words match whole words; phrases match anywhere in the text.
    pub keywords: &'static [&'static str],
    pub reply_en: &'static str,
    pub reply_es: &'static str,
    pub action: AssistAction,
    pub priority: i32,
}

/// Offline intent classifier used when the language model is unavailable.
pub struct RuleEngine {
    rules: Vec<IntentRule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleEngine {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(|r| -r.priority);
        Self { rules }
    }

    pub fn classify(&self, message: &str, state: SessionState) -> IntentResult {
        let normalized = message.to_lowercase();
        let words = tokenize(&normalized);
        let language = if is_spanish_tokens(&normalized, &words) { Language::Es } else { Language::En };

        let matched = self
            .rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| keyword_matches(k, &normalized, &words)));

        if let Some(rule) = matched {
            let reply = if language.is_spanish() { rule.reply_es } else { rule.reply_en };
            return IntentResult::new(reply, rule.intent, language).with_action(rule.action);
        }

        if state == SessionState::Greeting {
            let reply = if language.is_spanish() {
                "¡Con mucho gusto le ayudo! ¿Necesita cambiar un vuelo o verificar el estado de un vuelo?"
            } else {
                "I'd be happy to help! Do you need to change a flight, or check on a flight status?"
            };
            return IntentResult::new(reply, Intent::Greeting, language);
        }

        let reply = if language.is_spanish() {
            "Lo siento, no entendí bien. ¿Podría repetirlo?"
        } else {
            "I'm sorry, I didn't quite catch that. Could you please say that again?"
        };
        IntentResult::new(reply, Intent::Unclear, language)
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn keyword_matches(keyword: &str, text: &str, words: &[&str]) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        words.contains(&keyword)
    }
}

fn is_spanish_tokens(text: &str, words: &[&str]) -> bool {
    if text.contains('¿') || text.contains('¡') {
        return true;
    }
    SPANISH_MARKERS.iter().any(|k| keyword_matches(k, text, words))
}

/// Whether an utterance looks Spanish.
pub fn detect_spanish(text: &str) -> bool {
    let normalized = text.to_lowercase();
    let words = tokenize(&normalized);
    is_spanish_tokens(&normalized, &words)
}

pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule {
            intent: Intent::RequestAgent,
            keywords: &[
                "agent", "representative", "human", "operator", "real person", "speak to someone",
                "talk to someone", "agente", "representante", "una persona", "hablar con alguien",
            ],
            reply_en: "Of course. I'll connect you with one of our agents.",
            reply_es: "Claro que sí. Le comunico con uno de nuestros agentes.",
            action: AssistAction::None,
            priority: 100,
        },
        IntentRule {
            intent: Intent::ChangeFlight,
            keywords: &[
                "change", "reschedule", "different", "move", "rebook", "cambiar", "mover", "cambio",
            ],
            reply_en: "I'd be happy to help you change your flight. What's your confirmation code?",
            reply_es: "Me encantaría ayudarle a cambiar su vuelo. ¿Cuál es su código de confirmación?",
            action: AssistAction::None,
            priority: 90,
        },
        IntentRule {
            intent: Intent::CheckStatus,
            keywords: &["status", "where", "when", "time", "estado", "dónde", "donde", "cuándo", "cuando"],
            reply_en: "I can check your flight status. What's your confirmation code?",
            reply_es: "Puedo verificar el estado de su vuelo. ¿Cuál es su código de confirmación?",
            action: AssistAction::None,
            priority: 80,
        },
        IntentRule {
            intent: Intent::ConfirmAction,
            keywords: &["yes", "yeah", "correct", "right", "confirm", "book", "sí", "si", "correcto", "confirmar"],
            reply_en: "Great! Let me confirm that change for you.",
            reply_es: "¡Perfecto! Permítame confirmar ese cambio.",
            action: AssistAction::ConfirmChange,
            priority: 70,
        },
        IntentRule {
            intent: Intent::CancelAction,
            keywords: &["no", "cancel", "never mind", "stop", "cancelar", "no importa"],
            reply_en: "No problem. Is there something else I can help you with?",
            reply_es: "No hay problema. ¿Hay algo más en que pueda ayudarle?",
            action: AssistAction::None,
            priority: 60,
        },
        IntentRule {
            intent: Intent::FamilyHelp,
            keywords: &["help", "family", "daughter", "son", "ayuda", "familia", "hija", "hijo"],
            reply_en: "I can create a link to share with your family so they can help. Would you like me to do that?",
            reply_es: "Puedo crear un enlace para compartir con su familia para que puedan ayudarle. ¿Le gustaría que lo haga?",
            action: AssistAction::None,
            priority: 50,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_request_in_english() {
        let engine = RuleEngine::default();
        let result = engine.classify("I need to change my flight", SessionState::Viewing);
        assert_eq!(result.intent, Intent::ChangeFlight);
        assert_eq!(result.detected_language, Language::En);
        assert!(result.reply.contains("change your flight"));
    }

    #[test]
    fn test_spanish_reply() {
        let engine = RuleEngine::default();
        let result = engine.classify("Quiero cambiar mi vuelo", SessionState::Viewing);
        assert_eq!(result.intent, Intent::ChangeFlight);
        assert_eq!(result.detected_language, Language::Es);
        assert!(result.reply.starts_with("Me encantaría"));
    }

    #[test]
    fn test_whole_word_matching() {
        let engine = RuleEngine::default();
        // "know" and "nothing" must not read as "no"
        let result = engine.classify("I don't know nothing about it", SessionState::Viewing);
        assert_eq!(result.intent, Intent::Unclear);

        let result = engine.classify("never mind", SessionState::Changing);
        assert_eq!(result.intent, Intent::CancelAction);
    }

    #[test]
    fn test_confirmation_and_agent() {
        let engine = RuleEngine::default();
        let result = engine.classify("Yes please", SessionState::Changing);
        assert_eq!(result.intent, Intent::ConfirmAction);
        assert_eq!(result.action, AssistAction::ConfirmChange);

        let result = engine.classify("Can I talk to a real person?", SessionState::Viewing);
        assert_eq!(result.intent, Intent::RequestAgent);
    }

    #[test]
    fn test_greeting_fallback_depends_on_state() {
        let engine = RuleEngine::default();
        assert_eq!(engine.classify("Good morning", SessionState::Greeting).intent, Intent::Greeting);
        assert_eq!(engine.classify("Good morning", SessionState::Viewing).intent, Intent::Unclear);
    }

    #[test]
    fn test_spanish_detection() {
        assert!(detect_spanish("Hola, necesito ayuda"));
        assert!(detect_spanish("¿Dónde está mi puerta?"));
        assert!(!detect_spanish("Where is my gate?"));
    }
}
