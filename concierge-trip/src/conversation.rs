use chrono::{DateTime, Duration, Utc};
use concierge_assist::{
    extract_confirmation_code, extract_stated_code, Intent, IntentRequest, IntentResult,
};
use concierge_core::models::{
    Language, Message, MessageRole, Reservation, ReservationView, Session, SessionState,
};
use concierge_core::search::FlightOption;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{TripError, TripResult};
use crate::flights::FlightCatalog;
use crate::format::{clock, month_day_at};
use crate::handoff::HandoffDesk;
use crate::helper::HelperLinks;
use crate::notify::Notifier;
use crate::reservations::ReservationService;
use crate::voice::VoiceService;

const GREETING: &str =
    "Hi! I'm your American Airlines assistant. I'm here to help with your trip. What do you need today?";
const WELCOME_BACK: &str = "Welcome back! How can I help you?";

/// Session context key holding the option offered for confirmation.
const PENDING_FLIGHT: &str = "pending_flight";

#[derive(Debug, Clone, Serialize)]
pub struct StartReply {
    pub session_id: Uuid,
    pub greeting: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub audio_url: Option<String>,
    pub intent: String,
    pub entities: Value,
    pub suggested_actions: Vec<SuggestedAction>,
    pub session_state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_options: Option<Vec<FlightOption>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: SessionState,
    pub reservation: Option<ReservationView>,
    pub messages: Vec<Message>,
    pub helper_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Working state of one conversational turn.
struct Turn {
    session: Session,
    reservation: Option<Reservation>,
    result: IntentResult,
    language: Language,
    reply: String,
    suggested_actions: Vec<SuggestedAction>,
    flight_options: Option<Vec<FlightOption>>,
}

/// The passenger-facing conversation: greeting, lookup, change, confirm.
#[derive(Clone)]
pub struct ConversationEngine {
    ctx: TripContext,
}

impl ConversationEngine {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Resumes a live session or opens a new one with a spoken greeting.
    pub async fn start(&self, session_id: Option<Uuid>) -> TripResult<StartReply> {
        if let Some(id) = session_id {
            if let Some(session) = self.ctx.store.get_session(id).await? {
                if !session.is_expired_at(Utc::now()) {
                    return self.resume(&session).await;
                }
            }
        }

        let session = Session::new(Duration::minutes(self.ctx.rules.session_expiry_minutes));
        self.ctx.store.save_session(&session).await?;

        let audio_url = VoiceService::new(self.ctx.clone()).audio_url(GREETING, Language::En).await;
        let message = Message::new(session.id, MessageRole::Assistant, GREETING)
            .with_intent(Intent::Greeting.as_str(), json!({}))
            .with_audio(audio_url.clone());
        self.ctx.append(&message).await?;

        info!(session_id = %session.id, "Conversation started");
        Ok(StartReply { session_id: session.id, greeting: GREETING.to_string(), audio_url })
    }

    async fn resume(&self, session: &Session) -> TripResult<StartReply> {
        let messages = self.ctx.store.list_messages(session.id).await?;
        let last = messages.iter().rev().find(|m| m.role == MessageRole::Assistant);
        Ok(StartReply {
            session_id: session.id,
            greeting: last.map(|m| m.content.clone()).unwrap_or_else(|| WELCOME_BACK.to_string()),
            audio_url: last.and_then(|m| m.audio_url.clone()),
        })
    }

    pub async fn handle_message(&self, session_id: Uuid, transcript: &str) -> TripResult<TurnReply> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(TripError::validation("session_id and transcript are required"));
        }
        let session = self.ctx.session(session_id).await?;
        if session.is_expired_at(Utc::now()) {
            return Err(TripError::Expired("Session has expired".to_string()));
        }

        let reservation = match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await?,
            None => None,
        };
        let history = self.ctx.store.list_messages(session.id).await?;
        self.ctx.append(&Message::new(session.id, MessageRole::User, transcript)).await?;

        let view = reservation.as_ref().map(ReservationView::from);
        let result = self
            .ctx
            .intents
            .interpret(&IntentRequest {
                message: transcript,
                state: session.state,
                reservation: view.as_ref(),
                history: &history,
                language_hint: session.language(),
            })
            .await;

        let language = result.detected_language;
        let mut turn = Turn {
            reply: result.reply.clone(),
            session,
            reservation,
            result,
            language,
            suggested_actions: Vec::new(),
            flight_options: None,
        };
        turn.session.set_context("language", json!(language.as_str()));

        if !self.try_lookup(&mut turn, transcript).await? {
            let intent = turn.result.intent;
            if intent.wants_change() && turn.reservation.is_some() {
                self.offer_alternatives(&mut turn).await;
            } else if intent == Intent::ConfirmAction && turn.session.state == SessionState::Changing {
                self.confirm_change(&mut turn).await?;
            } else if intent == Intent::FamilyHelp {
                self.share_with_family(&mut turn);
            } else if intent == Intent::RequestAgent {
                // The dossier reads the session, so it must be current first
                self.ctx.store.save_session(&turn.session).await?;
                HandoffDesk::new(self.ctx.clone())
                    .request(turn.session.id, "Passenger asked for an agent")
                    .await?;
                turn.reply = agent_reply(language).to_string();
            }
        }

        let audio_url = VoiceService::new(self.ctx.clone()).audio_url(&turn.reply, language).await;
        let reply = Message::new(turn.session.id, MessageRole::Assistant, turn.reply.clone())
            .with_intent(turn.result.intent.as_str(), turn.result.entities.clone())
            .with_audio(audio_url.clone());
        self.ctx.append(&reply).await?;
        self.ctx.store.save_session(&turn.session).await?;

        Ok(TurnReply {
            reply: turn.reply,
            audio_url,
            intent: turn.result.intent.to_string(),
            entities: turn.result.entities,
            suggested_actions: turn.suggested_actions,
            session_state: turn.session.state,
            reservation: turn.reservation.as_ref().map(ReservationView::from),
            flight_options: turn.flight_options,
        })
    }

    /// Greeting/lookup without a reservation: look for a confirmation code.
    /// True when the turn was handled.
    async fn try_lookup(&self, turn: &mut Turn, transcript: &str) -> TripResult<bool> {
        if turn.reservation.is_some()
            || !matches!(turn.session.state, SessionState::Greeting | SessionState::Lookup)
        {
            return Ok(false);
        }
        // Letter-only codes count only when the model says a code was given
        let stated = turn.result.intent == Intent::LookupReservation;
        let code = turn
            .result
            .entity("confirmation_code")
            .map(|c| c.replace([' ', '-'], "").to_uppercase())
            .or_else(|| {
                if stated {
                    extract_stated_code(transcript)
                } else {
                    extract_confirmation_code(transcript)
                }
            });
        let Some(code) = code else {
            return Ok(false);
        };

        match ReservationService::new(self.ctx.clone()).find_by_code(&code).await? {
            Some(reservation) => {
                turn.session.reservation_id = Some(reservation.id);
                self.ctx.transition(&mut turn.session, SessionState::Viewing);
                if let Some(flight) = reservation.first_flight() {
                    turn.reply = found_reply(
                        turn.language,
                        flight.origin_city(),
                        flight.destination_city(),
                        flight.departure_time,
                    );
                }
                info!(session_id = %turn.session.id, %code, "Reservation attached to session");
                turn.reservation = Some(reservation);
            }
            None => {
                turn.reply = not_found_reply(turn.language).to_string();
                self.ctx.transition(&mut turn.session, SessionState::Lookup);
            }
        }
        Ok(true)
    }

    async fn offer_alternatives(&self, turn: &mut Turn) {
        let Some(flight) = turn.reservation.as_ref().and_then(|r| r.first_flight()).cloned() else {
            return;
        };
        let date = (flight.departure_time + Duration::days(1)).date_naive();
        let options = FlightCatalog::new(self.ctx.clone())
            .alternatives(&flight.origin, &flight.destination, date)
            .await;

        self.ctx.transition(&mut turn.session, SessionState::Changing);
        if let Some(first) = options.first() {
            turn.session.set_context(PENDING_FLIGHT, json!(first));
            turn.reply = options_reply(turn.language, first.departure_time);
        }
        turn.flight_options = Some(options);
    }

    async fn confirm_change(&self, turn: &mut Turn) -> TripResult<()> {
        let pending = turn
            .session
            .context_value(PENDING_FLIGHT)
            .and_then(|v| serde_json::from_value::<FlightOption>(v.clone()).ok());
        let (Some(option), Some(reservation)) = (pending, turn.reservation.take()) else {
            return Ok(());
        };

        let change = ReservationService::new(self.ctx.clone()).apply_option(reservation, &option).await?;
        turn.session.remove_context(PENDING_FLIGHT);
        self.ctx.transition(&mut turn.session, SessionState::Complete);
        turn.reply = booked_reply(turn.language).to_string();

        if !Notifier::new(self.ctx.clone())
            .change_confirmation(&change.reservation, &change.original, &change.new)
            .await
        {
            warn!(session_id = %turn.session.id, "Change confirmation email not sent");
        }
        turn.reservation = Some(change.reservation);
        Ok(())
    }

    fn share_with_family(&self, turn: &mut Turn) {
        let links = HelperLinks::new(self.ctx.clone());
        links.ensure_link(&mut turn.session);
        let link = links.describe(&turn.session);

        turn.reply = family_reply(turn.language).to_string();
        turn.suggested_actions.push(SuggestedAction {
            kind: "share_link".to_string(),
            label: if turn.language.is_spanish() { "Compartir con la familia" } else { "Share with Family" }.to_string(),
            value: link.helper_url.unwrap_or(link.helper_link),
        });
    }

    pub async fn get_session(&self, id: Uuid) -> TripResult<SessionView> {
        let session = self.ctx.session(id).await?;
        self.view(&session).await
    }

    pub async fn view(&self, session: &Session) -> TripResult<SessionView> {
        let reservation = match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await?,
            None => None,
        };
        Ok(SessionView {
            id: session.id,
            state: session.state,
            reservation: reservation.as_ref().map(ReservationView::from),
            messages: self.ctx.store.list_messages(session.id).await?,
            helper_link: session.helper_link.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        })
    }
}

fn found_reply(language: Language, origin: &str, destination: &str, departure: DateTime<Utc>) -> String {
    match language {
        Language::Es => format!(
            "¡Listo! Encontré su reservación. Usted vuela de {} a {} el {}. ¿Qué le gustaría cambiar?",
            origin,
            destination,
            month_day_at(departure)
        ),
        Language::En => format!(
            "Got it! I found your reservation. You're flying from {} to {} on {}. What would you like to change?",
            origin,
            destination,
            month_day_at(departure)
        ),
    }
}

fn not_found_reply(language: Language) -> &'static str {
    match language {
        Language::Es => "No pude encontrar una reservación con ese código. ¿Podría verificarlo e intentar de nuevo?",
        Language::En => "I couldn't find a reservation with that code. Could you please check and try again?",
    }
}

fn options_reply(language: Language, departure: DateTime<Utc>) -> String {
    match language {
        Language::Es => format!(
            "Encontré algunos vuelos para usted. Hay uno a las {}. ¿Le gustaría que se lo reserve?",
            clock(departure)
        ),
        Language::En => format!(
            "I found some flights for you. There's one at {}. Would you like me to book that for you?",
            clock(departure)
        ),
    }
}

fn booked_reply(language: Language) -> &'static str {
    match language {
        Language::Es => "¡Perfecto! Todo está listo. Su nuevo vuelo ha sido reservado. Le enviaré los detalles por correo electrónico. ¿Hay algo más en lo que pueda ayudarle?",
        Language::En => "Perfect! You're all set. Your new flight has been booked. I'm sending the details to your email. Is there anything else I can help with?",
    }
}

fn family_reply(language: Language) -> &'static str {
    match language {
        Language::Es => "He creado un enlace que puede compartir con su familia. Podrán ver lo que estamos haciendo y ayudarle. El enlace está listo para compartir.",
        Language::En => "I've created a link you can share with your family. They'll be able to see what we're working on and help guide you. The link is ready to share.",
    }
}

fn agent_reply(language: Language) -> &'static str {
    match language {
        Language::Es => "Le estoy comunicando con uno de nuestros agentes ahora. Tendrán todo lo que hemos conversado.",
        Language::En => "I'm connecting you with one of our agents now. They'll have everything we've discussed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubMailer};
    use concierge_core::models::{HandoffStatus, ReservationStatus};
    use concierge_shared::models::events::ConciergeEvent;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_start_and_resume() {
        let engine = ConversationEngine::new(context());
        let started = engine.start(None).await.unwrap();
        assert_eq!(started.greeting, GREETING);
        assert_eq!(started.audio_url, None);

        let resumed = engine.start(Some(started.session_id)).await.unwrap();
        assert_eq!(resumed.session_id, started.session_id);
        assert_eq!(resumed.greeting, GREETING);

        let fresh = engine.start(Some(Uuid::new_v4())).await.unwrap();
        assert_ne!(fresh.session_id, started.session_id);
    }

    #[tokio::test]
    async fn test_lookup_change_confirm_flow() {
        let mailer = Arc::new(StubMailer::default());
        let mut ctx = context();
        ctx.vendors.mailer = Some(mailer.clone());
        let mut events = ctx.events.subscribe();
        let engine = ConversationEngine::new(ctx.clone());
        let id = engine.start(None).await.unwrap().session_id;

        let turn = engine.handle_message(id, "My code is DEMO123").await.unwrap();
        assert_eq!(turn.session_state, SessionState::Viewing);
        assert!(turn.reply.starts_with("Got it! I found your reservation. You're flying from Dallas to Chicago on "));
        assert_eq!(turn.reservation.as_ref().unwrap().confirmation_code, "DEMO123");

        let turn = engine.handle_message(id, "I need to change my flight").await.unwrap();
        assert_eq!(turn.session_state, SessionState::Changing);
        assert_eq!(turn.flight_options.as_ref().unwrap().len(), 3);
        assert_eq!(
            turn.reply,
            "I found some flights for you. There's one at 08:00 AM. Would you like me to book that for you?"
        );

        let turn = engine.handle_message(id, "Yes please").await.unwrap();
        assert_eq!(turn.session_state, SessionState::Complete);
        assert!(turn.reply.starts_with("Perfect! You're all set."));
        let reservation = turn.reservation.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Changed);
        assert!(reservation.flights[0].id.starts_with("mock-DFW-ORD-1-"));
        assert_eq!(mailer.subjects(), vec!["Flight Change Confirmed - DEMO123".to_string()]);

        let view = engine.get_session(id).await.unwrap();
        assert_eq!(view.messages.len(), 7);
        assert!(matches!(events.try_recv(), Ok(ConciergeEvent::MessageAppended(_))));
    }

    #[tokio::test]
    async fn test_unknown_code_moves_to_lookup() {
        let engine = ConversationEngine::new(context());
        let id = engine.start(None).await.unwrap().session_id;
        let turn = engine.handle_message(id, "It's ZZZ999").await.unwrap();
        assert_eq!(turn.session_state, SessionState::Lookup);
        assert_eq!(turn.reply, not_found_reply(Language::En));
    }

    #[tokio::test]
    async fn test_plain_words_do_not_trigger_lookup() {
        let ctx = context();
        let engine = ConversationEngine::new(ctx.clone());
        let id = engine.start(None).await.unwrap().session_id;
        let turn = engine.handle_message(id, "Please connect me to an agent").await.unwrap();
        assert_eq!(turn.intent, "request_agent");
        assert_eq!(turn.session_state, SessionState::Greeting);
        assert!(ctx.store.open_dossier_for_session(id).await.unwrap().is_some());

        let id = engine.start(None).await.unwrap().session_id;
        let turn = engine.handle_message(id, "I missed my flight, I'm worried").await.unwrap();
        assert_ne!(turn.reply, not_found_reply(Language::En));
        assert_ne!(turn.session_state, SessionState::Lookup);
    }

    #[tokio::test]
    async fn test_family_help_shares_link() {
        let engine = ConversationEngine::new(context());
        let id = engine.start(None).await.unwrap().session_id;
        let turn = engine.handle_message(id, "Can my family help me?").await.unwrap();
        assert_eq!(turn.intent, "family_help");
        assert_eq!(turn.suggested_actions[0].kind, "share_link");

        let view = engine.get_session(id).await.unwrap();
        assert_eq!(view.helper_link.as_deref(), Some(turn.suggested_actions[0].value.as_str()));
    }

    #[tokio::test]
    async fn test_agent_request_opens_dossier() {
        let ctx = context();
        let engine = ConversationEngine::new(ctx.clone());
        let id = engine.start(None).await.unwrap().session_id;
        let turn = engine.handle_message(id, "I want to talk to a real person").await.unwrap();
        assert_eq!(turn.intent, "request_agent");
        let open = ctx.store.open_dossier_for_session(id).await.unwrap().unwrap();
        assert_eq!(open.status, HandoffStatus::Pending);
    }

    #[tokio::test]
    async fn test_rejects_blank_and_expired() {
        let ctx = context();
        let engine = ConversationEngine::new(ctx.clone());
        let id = engine.start(None).await.unwrap().session_id;
        assert!(matches!(engine.handle_message(id, "  ").await, Err(TripError::Validation(_))));
        assert!(matches!(engine.handle_message(Uuid::new_v4(), "hi").await, Err(TripError::NotFound(_))));

        let mut session = ctx.store.get_session(id).await.unwrap().unwrap();
        session.expires_at = Utc::now() - Duration::seconds(1);
        ctx.store.save_session(&session).await.unwrap();
        assert!(matches!(engine.handle_message(id, "hello").await, Err(TripError::Expired(_))));
    }
}
